//! Request fingerprints used as cache keys

use super::request::{Purpose, QueryRequest};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

lazy_static! {
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

const FINGERPRINT_VERSION: &[u8] = b"docquery-fp-v1";

/// Deterministic SHA-256 digest of a logically unique request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryFingerprint(String);

impl QueryFingerprint {
    /// Fingerprint a request with its effective model and output budget.
    ///
    /// The caller resolves defaults first so that an omitted value and an explicit
    /// default produce the same key.
    pub fn compute(request: &QueryRequest, model: &str, max_output_tokens: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_VERSION);
        update_field(&mut hasher, purpose_tag(request.purpose()));
        update_field(&mut hasher, normalize_text(request.raw_text()).as_bytes());

        hasher.update((request.context_refs().len() as u64).to_le_bytes());
        for context in request.context_refs() {
            update_field(&mut hasher, context.name.as_bytes());
            update_field(&mut hasher, normalize_text(&context.text).as_bytes());
        }

        update_field(&mut hasher, model.as_bytes());
        hasher.update(max_output_tokens.to_le_bytes());

        Self(format!("{:x}", hasher.finalize()))
    }

    /// Wrap an already computed hex digest (e.g. read back from storage)
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for QueryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase and collapse whitespace runs to a single space
pub fn normalize_text(text: &str) -> String {
    WHITESPACE_RE
        .replace_all(text.trim(), " ")
        .to_lowercase()
}

fn purpose_tag(purpose: Purpose) -> &'static [u8] {
    purpose.as_str().as_bytes()
}

// Length-prefixed so adjacent fields cannot bleed into each other
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ContextRef;
    use proptest::prelude::*;

    fn fp(request: &QueryRequest) -> QueryFingerprint {
        QueryFingerprint::compute(request, "model-a", 500)
    }

    #[test]
    fn test_whitespace_and_case_insensitive() {
        let a = QueryRequest::analyze("The Employee shall   receive\n\na handbook.");
        let b = QueryRequest::analyze("  the employee SHALL receive a handbook. ");
        assert_eq!(fp(&a), fp(&b));
    }

    #[test]
    fn test_model_changes_fingerprint() {
        let request = QueryRequest::analyze("same text");
        assert_ne!(
            QueryFingerprint::compute(&request, "model-a", 500),
            QueryFingerprint::compute(&request, "model-b", 500)
        );
    }

    #[test]
    fn test_output_budget_changes_fingerprint() {
        let request = QueryRequest::analyze("same text");
        assert_ne!(
            QueryFingerprint::compute(&request, "model-a", 500),
            QueryFingerprint::compute(&request, "model-a", 800)
        );
    }

    #[test]
    fn test_purpose_and_context_change_fingerprint() {
        let analyze = QueryRequest::analyze("text");
        let chat = QueryRequest::chat("text");
        assert_ne!(fp(&analyze), fp(&chat));

        let with_ref = QueryRequest::analyze("text").with_context(ContextRef::new("std", "rule"));
        assert_ne!(fp(&analyze), fp(&with_ref));
    }

    #[test]
    fn test_context_order_matters() {
        let ab = QueryRequest::analyze("t")
            .with_context(ContextRef::new("a", "1"))
            .with_context(ContextRef::new("b", "2"));
        let ba = QueryRequest::analyze("t")
            .with_context(ContextRef::new("b", "2"))
            .with_context(ContextRef::new("a", "1"));
        assert_ne!(fp(&ab), fp(&ba));
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let digest = fp(&QueryRequest::analyze("x"));
        assert_eq!(digest.as_str().len(), 64);
        assert_eq!(digest.short().len(), 12);
    }

    proptest! {
        #[test]
        fn prop_whitespace_padding_is_ignored(words in proptest::collection::vec("[a-zA-Z]{1,8}", 1..20)) {
            let tight = words.join(" ");
            let loose = format!("  {}\n", words.join(" \t\n "));
            let upper = tight.to_uppercase();
            let base = fp(&QueryRequest::analyze(tight));
            prop_assert_eq!(&base, &fp(&QueryRequest::analyze(loose)));
            prop_assert_eq!(&base, &fp(&QueryRequest::analyze(upper)));
        }
    }
}
