//! Token cost estimation
//!
//! A cheap length-based heuristic used to pick chunk sizes and context budgets.
//! It is never a billing authority.

/// Average characters per token for Latin text
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token cost of a text
pub trait TokenEstimator: Send + Sync {
    /// Conservative, non-negative estimate, monotonically non-decreasing in text length
    fn estimate(&self, text: &str) -> usize;
}

/// Character-ratio estimator (~4 chars per token, 1 token per CJK char)
#[derive(Debug, Clone, Copy, Default)]
pub struct CharRatioEstimator;

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let mut latin = 0usize;
        let mut wide = 0usize;
        for c in text.chars() {
            if c.is_ascii() {
                latin += 1;
            } else if is_wide(c) {
                wide += 1;
            } else {
                // Other scripts tokenize roughly twice as densely as ASCII
                latin += 2;
            }
        }

        latin.div_ceil(CHARS_PER_TOKEN) + wide
    }
}

fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF   // Hiragana, Katakana
        | 0x3400..=0x4DBF // CJK Extension A
        | 0x4E00..=0x9FFF // CJK Unified
        | 0xAC00..=0xD7AF // Hangul
        | 0xF900..=0xFAFF // CJK Compatibility
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(CharRatioEstimator.estimate(""), 0);
    }

    #[test]
    fn test_ascii_ratio() {
        assert_eq!(CharRatioEstimator.estimate("abcd"), 1);
        assert_eq!(CharRatioEstimator.estimate("abcde"), 2);
        assert_eq!(CharRatioEstimator.estimate(&"x".repeat(20_000)), 5000);
    }

    #[test]
    fn test_cjk_counts_one_per_char() {
        assert_eq!(CharRatioEstimator.estimate("世界"), 2);
    }

    proptest! {
        #[test]
        fn prop_monotonic_in_length(base in ".{0,200}", extra in ".{0,50}") {
            let longer = format!("{}{}", base, extra);
            prop_assert!(CharRatioEstimator.estimate(&longer) >= CharRatioEstimator.estimate(&base));
        }
    }
}
