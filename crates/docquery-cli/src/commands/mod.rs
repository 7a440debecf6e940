//! CLI command handlers

pub mod analyze;
pub mod ask;
pub mod cache;
pub mod config;

use crate::app::{OutputFormat, QueryOptions};
use crate::output;
use anyhow::{Context, Result};
use docquery_core::{
    CancellationToken, Config, HttpModelInvoker, MemoryCacheStore, QueryRequest,
    ResilientQueryEngine, ResponseCache, ResponsePayload, SqliteCacheStore,
};
use std::path::Path;
use std::sync::Arc;

/// Read an already-extracted plain-text document
pub fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Display name for a document path
pub fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Apply the shared query flags to a request
pub fn apply_options(mut request: QueryRequest, options: &QueryOptions) -> QueryRequest {
    if let Some(tokens) = options.max_output_tokens {
        request = request.with_max_output_tokens(tokens);
    }
    if let Some(ref model) = options.model {
        request = request.with_preferred_model(model.clone());
    }
    request
}

fn open_cache(db_path: &Path, no_cache: bool) -> Arc<dyn ResponseCache> {
    if no_cache {
        return Arc::new(MemoryCacheStore::new());
    }
    match SqliteCacheStore::open(db_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(
                "Cannot open cache at {}, continuing without persistence: {}",
                db_path.display(),
                e
            );
            Arc::new(MemoryCacheStore::new())
        }
    }
}

/// Run a request through the engine and print the outcome.
///
/// Ctrl-C cancels the run. When no answer is available the placeholder is
/// printed and the typed failure is returned so the process exits non-zero.
pub async fn run_query(
    request: QueryRequest,
    options: &QueryOptions,
    config: &Config,
    db_path: &Path,
    format: OutputFormat,
) -> Result<()> {
    let invoker = HttpModelInvoker::new(config.llm_service.clone())?;
    let cache = open_cache(db_path, options.no_cache);
    let engine = ResilientQueryEngine::new(config.engine.clone(), Arc::new(invoker), cache)?;

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, cancelling");
                cancel.cancel();
            }
        })
    };

    let outcome = engine.run(&request, &cancel).await;
    ctrl_c.abort();

    match outcome {
        Ok(result) => {
            print!("{}", output::format_result(&result, format));
            if result.degraded && format == OutputFormat::Cli {
                eprintln!("{}", output::degraded_warning(&result));
            }
            Ok(())
        }
        Err(error) => {
            let placeholder = ResponsePayload::placeholder_for(&error);
            print!("{}", output::format_failure(&placeholder, &error, format));
            Err(error.into())
        }
    }
}
