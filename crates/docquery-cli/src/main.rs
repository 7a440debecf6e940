//! Docquery CLI
//!
//! Analyze documents and ask questions against remote LLM services.

use anyhow::Result;
use clap::Parser;
use docquery_core::error::exit_codes;
use docquery_core::{Config, DocQueryError, QueryError, SqliteCacheStore};
use std::path::PathBuf;

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays parseable
    let directive = if cli.verbose {
        "warn,docquery_core=debug"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Use DOCQUERY_DB env var if set, otherwise the default cache location
    let db_path = std::env::var("DOCQUERY_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| SqliteCacheStore::default_path());

    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args, &config, &db_path, cli.format).await,
        Commands::Ask(args) => commands::ask::run(args, &config, &db_path, cli.format).await,
        Commands::Cache(args) => commands::cache::run(args, &db_path, cli.format),
        Commands::Config => commands::config::run(&config, cli.format),
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    if let Some(e) = error.downcast_ref::<QueryError>() {
        return e.exit_code();
    }
    if let Some(e) = error.downcast_ref::<DocQueryError>() {
        return e.exit_code();
    }
    if let Some(e) = error.downcast_ref::<std::io::Error>() {
        if e.kind() == std::io::ErrorKind::NotFound {
            return exit_codes::NOT_FOUND;
        }
    }
    exit_codes::GENERAL_ERROR
}
