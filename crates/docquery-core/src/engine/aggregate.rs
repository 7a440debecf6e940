//! Merging chunk answers back into one result

use crate::query::{Analysis, ResponsePayload};

/// A successful answer for one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkAnswer {
    pub index: usize,
    pub payload: ResponsePayload,
    pub model_used: String,
    /// Rung of the tier ladder that answered
    pub tier: usize,
}

/// Combined answer over all successful chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub payload: ResponsePayload,
    /// Model of the lowest-capability tier that answered any chunk
    pub model_used: String,
    pub tier: usize,
}

/// Merge chunk answers in chunk order. Returns `None` when there is nothing to merge.
pub fn aggregate(mut answers: Vec<ChunkAnswer>) -> Option<Aggregate> {
    answers.sort_by_key(|a| a.index);

    let lowest = answers.iter().max_by_key(|a| a.tier)?;
    let model_used = lowest.model_used.clone();
    let tier = lowest.tier;

    let payload = merge_payloads(answers.into_iter().map(|a| a.payload).collect());
    Some(Aggregate {
        payload,
        model_used,
        tier,
    })
}

/// Merge ordered payloads.
///
/// All-structured input stays structured; any free-form part turns the whole
/// result into text joined by blank lines.
pub fn merge_payloads(mut payloads: Vec<ResponsePayload>) -> ResponsePayload {
    if payloads.len() == 1 {
        return payloads.remove(0);
    }

    let all_structured = payloads
        .iter()
        .all(|p| matches!(p, ResponsePayload::StructuredAnalysis(_)));

    if all_structured {
        let mut merged = Analysis::default();
        for payload in payloads {
            if let ResponsePayload::StructuredAnalysis(analysis) = payload {
                for clause in analysis.key_clauses {
                    if !merged.key_clauses.contains(&clause) {
                        merged.key_clauses.push(clause);
                    }
                }
                merged.compliance_issues.extend(analysis.compliance_issues);
            }
        }
        return ResponsePayload::StructuredAnalysis(merged);
    }

    let text = payloads
        .iter()
        .map(|p| p.to_text().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    ResponsePayload::PlainText(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ComplianceIssue;

    fn structured(clauses: &[&str], issue: Option<&str>) -> ResponsePayload {
        ResponsePayload::StructuredAnalysis(Analysis {
            key_clauses: clauses.iter().map(|c| c.to_string()).collect(),
            compliance_issues: issue
                .map(|title| {
                    vec![ComplianceIssue {
                        title: title.to_string(),
                        risk_level: "Low".into(),
                        reason: String::new(),
                    }]
                })
                .unwrap_or_default(),
        })
    }

    fn answer(index: usize, tier: usize, payload: ResponsePayload) -> ChunkAnswer {
        ChunkAnswer {
            index,
            payload,
            model_used: format!("model-{}", tier),
            tier,
        }
    }

    #[test]
    fn test_structured_merge_keeps_order_and_dedups() {
        let merged = merge_payloads(vec![
            structured(&["Payment", "Term"], Some("a")),
            structured(&["Term", "Notice"], Some("b")),
        ]);
        match merged {
            ResponsePayload::StructuredAnalysis(analysis) => {
                assert_eq!(analysis.key_clauses, vec!["Payment", "Term", "Notice"]);
                assert_eq!(analysis.compliance_issues.len(), 2);
                assert_eq!(analysis.compliance_issues[1].title, "b");
            }
            other => panic!("expected structured, got {:?}", other),
        }
    }

    #[test]
    fn test_mixed_merge_is_text() {
        let merged = merge_payloads(vec![
            ResponsePayload::PlainText("first".into()),
            structured(&["Clause"], None),
        ]);
        match merged {
            ResponsePayload::PlainText(text) => {
                assert!(text.starts_with("first\n\nKEY CLAUSES:"));
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_aggregate_sorts_by_index() {
        let result = aggregate(vec![
            answer(2, 0, ResponsePayload::PlainText("c".into())),
            answer(0, 0, ResponsePayload::PlainText("a".into())),
            answer(1, 1, ResponsePayload::PlainText("b".into())),
        ])
        .unwrap();
        assert_eq!(result.payload, ResponsePayload::PlainText("a\n\nb\n\nc".into()));
        assert_eq!(result.model_used, "model-1");
        assert_eq!(result.tier, 1);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(Vec::new()).is_none());
    }
}
