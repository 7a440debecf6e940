//! Response cache interface

use crate::error::Result;
use crate::query::{QueryFingerprint, ResponsePayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached response. Never mutated in place; replaced wholesale by `put`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: QueryFingerprint,
    pub response_payload: ResponsePayload,
    pub created_at: DateTime<Utc>,
    pub model_used: String,
    pub token_cost: usize,
    /// The cached result was degraded (lower tier, partial, or truncated)
    pub degraded: bool,
}

impl CacheEntry {
    pub fn new(
        fingerprint: QueryFingerprint,
        response_payload: ResponsePayload,
        model_used: impl Into<String>,
        token_cost: usize,
        degraded: bool,
    ) -> Self {
        Self {
            fingerprint,
            response_payload,
            created_at: Utc::now(),
            model_used: model_used.into(),
            token_cost,
            degraded,
        }
    }

    /// Whether the entry is older than `age` at `now`
    pub fn is_older_than(&self, age: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(age) {
            Ok(age) => self.created_at + age < now,
            // An age too large to represent never expires anything
            Err(_) => false,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub degraded_entries: usize,
    pub total_token_cost: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Persistent key-value store for responses, keyed by request fingerprint.
///
/// Implementations assume at most one writer per fingerprint at a time and make
/// no cross-key atomicity promises. A single `put` must never be observable half
/// written.
pub trait ResponseCache: Send + Sync {
    /// Look up an entry
    fn get(&self, fingerprint: &QueryFingerprint) -> Result<Option<CacheEntry>>;

    /// Insert or replace the entry stored under `entry.fingerprint`
    fn put(&self, entry: &CacheEntry) -> Result<()>;

    /// Delete entries created more than `age` ago, returning how many were removed
    fn evict_older_than(&self, age: Duration) -> Result<usize>;

    /// Summary of cache contents
    fn stats(&self) -> Result<CacheStats>;

    /// Remove every entry, returning how many were removed
    fn clear(&self) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_older_than() {
        let mut entry = CacheEntry::new(
            QueryFingerprint::from_hex("ab"),
            ResponsePayload::PlainText("x".into()),
            "m",
            1,
            false,
        );
        let now = Utc::now();
        entry.created_at = now - chrono::Duration::seconds(120);

        assert!(entry.is_older_than(Duration::from_secs(60), now));
        assert!(!entry.is_older_than(Duration::from_secs(300), now));
        assert!(!entry.is_older_than(Duration::MAX, now));
    }
}
