//! JSON output formatter

use docquery_core::{QueryError, QueryResult, ResponsePayload};

pub fn format_result(result: &QueryResult) -> String {
    let output = serde_json::json!({
        "payload": result.payload,
        "model_used": result.model_used,
        "cache_hit": result.cache_hit,
        "degraded": result.degraded,
        "token_cost": result.token_cost,
        "chunk_count": result.chunk_count,
        "chunks_failed": result.chunks_failed,
        "wait_ms": result.total_wait_ms(),
    });

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string()) + "\n"
}

pub fn format_failure(placeholder: &ResponsePayload, error: &QueryError) -> String {
    let output = serde_json::json!({
        "payload": placeholder,
        "error": error.to_string(),
    });

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string()) + "\n"
}
