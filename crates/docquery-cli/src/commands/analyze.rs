//! Analyze command

use super::{apply_options, document_name, read_document, run_query};
use crate::app::{AnalyzeArgs, OutputFormat};
use anyhow::Result;
use docquery_core::{Config, ContextRef, QueryRequest};
use std::path::Path;

pub async fn run(
    args: AnalyzeArgs,
    config: &Config,
    db_path: &Path,
    format: OutputFormat,
) -> Result<()> {
    let text = read_document(&args.file)?;

    let mut contexts = Vec::with_capacity(args.contexts.len());
    for path in &args.contexts {
        contexts.push(ContextRef::new(document_name(path), read_document(path)?));
    }

    let request = apply_options(QueryRequest::analyze(text).with_contexts(contexts), &args.options);
    run_query(request, &args.options, config, db_path, format).await
}
