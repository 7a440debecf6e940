//! Terminal output formatter

use docquery_core::QueryResult;

pub fn format_result(result: &QueryResult) -> String {
    let mut output = result.payload.to_text();
    if !output.ends_with('\n') {
        output.push('\n');
    }

    output.push('\n');
    output.push_str(&format!("Model: {}", result.model_used));
    if result.cache_hit {
        output.push_str(" (cached)");
    } else if result.chunk_count > 1 {
        output.push_str(&format!(" ({} parts)", result.chunk_count));
    }
    output.push('\n');

    output
}
