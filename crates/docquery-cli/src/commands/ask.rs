//! Ask command

use super::{apply_options, document_name, read_document, run_query};
use crate::app::{AskArgs, OutputFormat};
use anyhow::Result;
use docquery_core::{Config, ContextRef, QueryRequest};
use std::path::Path;

pub async fn run(args: AskArgs, config: &Config, db_path: &Path, format: OutputFormat) -> Result<()> {
    let document = read_document(&args.file)?;
    let question = args.question.join(" ");

    // The document travels as reference context; the question is the request text
    let request = QueryRequest::chat(question)
        .with_context(ContextRef::new(document_name(&args.file), document));
    let request = apply_options(request, &args.options);

    run_query(request, &args.options, config, db_path, format).await
}
