//! Backoff policy for the per-tier retry ladder

use crate::config::EngineConfig;
use std::time::Duration;

/// Exponential backoff with a shared attempt budget per tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Calls allowed per tier, shared by rate-limit and transient failures
    pub attempts_per_tier: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            attempts_per_tier: config.retry_attempts_per_tier,
            base_backoff_ms: config.base_backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
        }
    }

    /// Delay after the failed attempt `attempt` (zero-based).
    ///
    /// The delay doubles each attempt and is capped at `max_backoff_ms`. A server
    /// hint can lengthen the wait but never past the cap.
    pub fn delay_for_attempt(&self, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let backoff = self
            .base_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        let wait = match retry_after_ms {
            Some(hint) => backoff.max(hint).min(self.max_backoff_ms),
            None => backoff,
        };
        Duration::from_millis(wait)
    }

    /// Whether another attempt at the same tier is allowed after `attempt` failed
    pub fn has_next_attempt(&self, attempt: u32) -> bool {
        attempt + 1 < self.attempts_per_tier
    }

    /// Longest total wait a single tier can consume
    pub fn max_wait_per_tier(&self) -> Duration {
        (0..self.attempts_per_tier.saturating_sub(1))
            .map(|attempt| self.delay_for_attempt(attempt, None))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            attempts_per_tier: 3,
            base_backoff_ms: 1000,
            max_backoff_ms: 30_000,
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = policy();
        assert_eq!(policy.delay_for_attempt(0, None), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(1, None), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(2, None), Duration::from_millis(4000));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = policy();
        assert_eq!(policy.delay_for_attempt(10, None), Duration::from_millis(30_000));
        assert_eq!(policy.delay_for_attempt(200, None), Duration::from_millis(30_000));
    }

    #[test]
    fn test_retry_after_hint() {
        let policy = policy();
        assert_eq!(
            policy.delay_for_attempt(0, Some(5000)),
            Duration::from_millis(5000)
        );
        // A shorter hint does not shorten the backoff
        assert_eq!(
            policy.delay_for_attempt(1, Some(10)),
            Duration::from_millis(2000)
        );
        assert_eq!(
            policy.delay_for_attempt(0, Some(600_000)),
            Duration::from_millis(30_000)
        );
    }

    #[test]
    fn test_attempt_budget() {
        let policy = policy();
        assert!(policy.has_next_attempt(0));
        assert!(policy.has_next_attempt(1));
        assert!(!policy.has_next_attempt(2));
        assert_eq!(policy.max_wait_per_tier(), Duration::from_millis(3000));
    }

    #[test]
    fn test_from_config() {
        let config = EngineConfig::default();
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.attempts_per_tier, config.retry_attempts_per_tier);
        assert_eq!(policy.base_backoff_ms, config.base_backoff_ms);
    }
}
