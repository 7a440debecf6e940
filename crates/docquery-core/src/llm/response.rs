//! Validation of raw model output into a [`ResponsePayload`]

use crate::error::InvokeError;
use crate::query::{Analysis, Purpose, ResponsePayload};
use lazy_static::lazy_static;
use regex::Regex;

/// Key clauses kept from a single call
pub const MAX_KEY_CLAUSES: usize = 10;

/// Compliance issues kept from a single call
pub const MAX_COMPLIANCE_ISSUES: usize = 8;

lazy_static! {
    static ref JSON_OBJECT_RE: Regex = Regex::new(r"(?s)\{.*\}").unwrap();
}

/// Turn raw model text into a typed payload.
///
/// An empty response is reported as a transient failure so that it enters the
/// retry ladder.
pub fn parse_payload(purpose: Purpose, raw: &str) -> Result<ResponsePayload, InvokeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InvokeError::Transient("Empty response from LLM".to_string()));
    }

    match purpose {
        Purpose::Analyze => Ok(parse_analysis(trimmed)
            .map(ResponsePayload::StructuredAnalysis)
            .unwrap_or_else(|| ResponsePayload::PlainText(trimmed.to_string()))),
        Purpose::Chat => Ok(ResponsePayload::PlainText(trimmed.to_string())),
    }
}

fn parse_analysis(text: &str) -> Option<Analysis> {
    let json_str = JSON_OBJECT_RE.find(text)?.as_str();
    let value: serde_json::Value = serde_json::from_str(json_str).ok()?;

    let object = value.as_object()?;
    if !object.contains_key("key_clauses") && !object.contains_key("compliance_issues") {
        return None;
    }

    match serde_json::from_value::<Analysis>(value) {
        Ok(mut analysis) => {
            analysis.key_clauses.truncate(MAX_KEY_CLAUSES);
            analysis.compliance_issues.truncate(MAX_COMPLIANCE_ISSUES);
            Some(analysis)
        }
        Err(e) => {
            tracing::debug!("Analysis JSON did not match schema: {}", e);
            None
        }
    }
}
