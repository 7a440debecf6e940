//! Query results and per-run provenance

use crate::error::{FailureKind, QueryError};
use serde::{Deserialize, Serialize};

/// Placeholder shown when rate limits prevented any answer
pub const RATE_LIMIT_PLACEHOLDER: &str =
    "Unable to process due to API rate limits. Please try again in a few minutes.";

/// Placeholder shown for any other unavailable answer
pub const UNAVAILABLE_PLACEHOLDER: &str =
    "No answer is available right now. Please try again later.";

/// A compliance issue reported by an analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceIssue {
    pub title: String,
    #[serde(default)]
    pub risk_level: String,
    #[serde(default)]
    pub reason: String,
}

/// Structured analysis output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub key_clauses: Vec<String>,
    #[serde(default)]
    pub compliance_issues: Vec<ComplianceIssue>,
}

impl Analysis {
    /// Render as plain text (used when merged with free-form parts)
    pub fn to_text(&self) -> String {
        let mut out = String::from("KEY CLAUSES:\n");
        for clause in &self.key_clauses {
            out.push_str("- ");
            out.push_str(clause);
            out.push('\n');
        }
        out.push_str("\nPOTENTIAL COMPLIANCE ISSUES:\n");
        for issue in &self.compliance_issues {
            out.push_str(&format!(
                "- {} (Risk Level: {})\n  Reason: {}\n",
                issue.title, issue.risk_level, issue.reason
            ));
        }
        out
    }
}

/// Validated model output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResponsePayload {
    StructuredAnalysis(Analysis),
    PlainText(String),
    FallbackPlaceholder(String),
}

impl ResponsePayload {
    /// User-facing placeholder for a run that produced no answer
    pub fn placeholder_for(error: &QueryError) -> Self {
        let message = match error {
            QueryError::Exhausted {
                last: FailureKind::RateLimited,
                ..
            } => RATE_LIMIT_PLACEHOLDER,
            _ => UNAVAILABLE_PLACEHOLDER,
        };
        ResponsePayload::FallbackPlaceholder(message.to_string())
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ResponsePayload::FallbackPlaceholder(_))
    }

    /// Render any variant as text
    pub fn to_text(&self) -> String {
        match self {
            ResponsePayload::StructuredAnalysis(analysis) => analysis.to_text(),
            ResponsePayload::PlainText(text) | ResponsePayload::FallbackPlaceholder(text) => {
                text.clone()
            }
        }
    }
}

/// Outcome of one model call attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Ok,
    RateLimited,
    TransientError,
    FatalError,
}

impl From<FailureKind> for AttemptOutcome {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::RateLimited => AttemptOutcome::RateLimited,
            FailureKind::Transient => AttemptOutcome::TransientError,
            FailureKind::Fatal => AttemptOutcome::FatalError,
        }
    }
}

/// One call attempt within a run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub chunk_index: usize,
    pub model_used: String,
    pub tier: usize,
    pub attempt_number: u32,
    pub wait_before_ms: u64,
    pub outcome: AttemptOutcome,
}

/// Result returned by a successful run
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub payload: ResponsePayload,
    pub model_used: String,
    pub cache_hit: bool,
    /// A lower tier, partial chunk coverage, or truncated context was used
    pub degraded: bool,
    /// Estimated token cost of the request
    pub token_cost: usize,
    pub chunk_count: usize,
    pub chunks_failed: usize,
    /// Attempts made during this run (empty on a cache hit)
    pub attempts: Vec<AttemptRecord>,
}

impl QueryResult {
    /// Total backoff wait consumed by this run
    pub fn total_wait_ms(&self) -> u64 {
        self.attempts.iter().map(|a| a.wait_before_ms).sum()
    }
}
