//! Prompt assembly and context budgeting

use super::tokens::{TokenEstimator, CHARS_PER_TOKEN};
use crate::query::{ContextRef, Purpose};

/// Position of a chunk within a chunked request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPart {
    pub index: usize,
    pub total: usize,
}

/// Reference documents that fit the context budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittedContext {
    pub refs: Vec<ContextRef>,
    pub truncated: bool,
}

/// Trim reference documents so that their estimated cost plus the output budget
/// stays within `token_budget`. Later references are dropped first.
pub fn fit_context(
    refs: &[ContextRef],
    estimator: &dyn TokenEstimator,
    token_budget: usize,
    max_output_tokens: u32,
) -> FittedContext {
    let mut remaining = token_budget.saturating_sub(max_output_tokens as usize);
    let mut kept = Vec::with_capacity(refs.len());
    let mut truncated = false;

    for context in refs {
        let cost = estimator.estimate(&context.text);
        if cost <= remaining {
            remaining -= cost;
            kept.push(context.clone());
            continue;
        }

        truncated = true;
        if remaining > 0 {
            let cut = fitting_prefix(&context.text, estimator, remaining);
            if cut > 0 {
                kept.push(ContextRef::new(context.name.clone(), &context.text[..cut]));
            }
        }
        break;
    }

    FittedContext { refs: kept, truncated }
}

/// Longest char-boundary prefix whose estimate stays within `budget`.
/// Relies on the estimator being non-decreasing in text length.
fn fitting_prefix(text: &str, estimator: &dyn TokenEstimator, budget: usize) -> usize {
    let upper = floor_char_boundary(text, budget.saturating_mul(CHARS_PER_TOKEN));
    if estimator.estimate(&text[..upper]) <= budget {
        return upper;
    }

    // Dense scripts cost more than one token per CHARS_PER_TOKEN bytes
    let (mut lo, mut hi) = (0, upper);
    while lo < hi {
        let mut mid = lo + (hi - lo).div_ceil(2);
        while !text.is_char_boundary(mid) {
            mid += 1;
        }
        if estimator.estimate(&text[..mid]) <= budget {
            lo = mid;
        } else {
            hi = floor_char_boundary(text, mid - 1);
        }
    }
    lo
}

/// Render the text payload for one model call
pub fn build_prompt(
    purpose: Purpose,
    text: &str,
    refs: &[ContextRef],
    part: Option<ChunkPart>,
) -> String {
    let references = render_references(refs);
    match purpose {
        Purpose::Analyze => {
            let part_note = part
                .filter(|p| p.total > 1)
                .map(|p| format!(" (part {} of {})", p.index + 1, p.total))
                .unwrap_or_default();
            format!(
                r#"Analyze this contract{part_note} for compliance issues ONLY.

Compliance Standards:
{references}

Contract Text:
{text}

Return ONLY valid JSON (no markdown, no extra text):
{{"key_clauses": ["clause1", "clause2"], "compliance_issues": [{{"title": "Issue Title", "risk_level": "High/Medium/Low", "reason": "Brief reason"}}]}}"#
            )
        }
        Purpose::Chat => format!(
            r#"You are a compliance advisor. Answer briefly:
Question: {text}
Documents:
{references}
Answer:"#
        ),
    }
}

fn render_references(refs: &[ContextRef]) -> String {
    if refs.is_empty() {
        return "(none provided)".to_string();
    }
    refs.iter()
        .map(|r| format!("--- {} ---\n{}", r.name, r.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Find a valid char boundary at or before the given byte index
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tokens::CharRatioEstimator;

    #[test]
    fn test_context_within_budget_is_untouched() {
        let refs = vec![ContextRef::new("a", "x".repeat(400))];
        let fitted = fit_context(&refs, &CharRatioEstimator, 3000, 500);
        assert!(!fitted.truncated);
        assert_eq!(fitted.refs, refs);
    }

    #[test]
    fn test_context_over_budget_is_truncated() {
        let refs = vec![
            ContextRef::new("first", "a".repeat(400)),
            ContextRef::new("second", "b".repeat(4000)),
            ContextRef::new("third", "c".repeat(40)),
        ];
        // 300 tokens left after output: first costs 100, second is cut to 200 tokens
        let fitted = fit_context(&refs, &CharRatioEstimator, 800, 500);
        assert!(fitted.truncated);
        assert_eq!(fitted.refs.len(), 2);
        assert_eq!(fitted.refs[1].name, "second");
        assert_eq!(fitted.refs[1].text.len(), 800);
    }

    #[test]
    fn test_wide_script_truncation_stays_within_budget() {
        let refs = vec![ContextRef::new("labour-code", "노동법".repeat(500))];
        let fitted = fit_context(&refs, &CharRatioEstimator, 600, 500);
        assert!(fitted.truncated);
        assert_eq!(fitted.refs.len(), 1);

        let kept = &fitted.refs[0].text;
        assert_eq!(CharRatioEstimator.estimate(kept), 100);
        assert_eq!(kept.chars().count(), 100);
    }

    #[test]
    fn test_output_budget_exhausts_context() {
        let refs = vec![ContextRef::new("a", "text")];
        let fitted = fit_context(&refs, &CharRatioEstimator, 400, 500);
        assert!(fitted.truncated);
        assert!(fitted.refs.is_empty());
    }

    #[test]
    fn test_analyze_prompt_mentions_part() {
        let prompt = build_prompt(
            Purpose::Analyze,
            "clause text",
            &[],
            Some(ChunkPart { index: 1, total: 4 }),
        );
        assert!(prompt.contains("(part 2 of 4)"));
        assert!(prompt.contains("clause text"));
        assert!(prompt.contains("\"key_clauses\""));
    }

    #[test]
    fn test_chat_prompt_includes_references() {
        let refs = vec![ContextRef::new("contract.txt", "Notice period is 30 days.")];
        let prompt = build_prompt(Purpose::Chat, "What is the notice period?", &refs, None);
        assert!(prompt.contains("Question: What is the notice period?"));
        assert!(prompt.contains("--- contract.txt ---"));
    }
}
