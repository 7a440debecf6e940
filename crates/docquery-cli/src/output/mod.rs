//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use docquery_core::{QueryError, QueryResult, ResponsePayload};

/// Format a successful run
pub fn format_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_result(result),
        OutputFormat::Cli => terminal::format_result(result),
    }
}

/// Format a run that produced no answer
pub fn format_failure(
    placeholder: &ResponsePayload,
    error: &QueryError,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Json => json::format_failure(placeholder, error),
        OutputFormat::Cli => format!("{}\n", placeholder.to_text()),
    }
}

/// One-line warning for a degraded answer
pub fn degraded_warning(result: &QueryResult) -> String {
    let mut warning = format!(
        "Warning: degraded answer from {} (fallback model or truncated context)",
        result.model_used
    );
    if result.chunks_failed > 0 {
        warning.push_str(&format!(
            "; {} of {} parts could not be analyzed",
            result.chunks_failed, result.chunk_count
        ));
    }
    warning
}
