//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docquery")]
#[command(
    author,
    version,
    about = "Analyze documents with remote LLMs, with caching, retries and model fallback"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, env = "DOCQUERY_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a document for key clauses and compliance issues
    Analyze(AnalyzeArgs),

    /// Ask a question about a document
    Ask(AskArgs),

    /// Manage the response cache
    Cache(CacheArgs),

    /// Print the effective configuration
    Config,
}

/// Options shared by commands that run a query
#[derive(Args)]
pub struct QueryOptions {
    /// Model to try first
    #[arg(short, long)]
    pub model: Option<String>,

    /// Output token budget
    #[arg(long)]
    pub max_output_tokens: Option<u32>,

    /// Bypass the persistent cache for this run
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Plain-text document to analyze
    pub file: PathBuf,

    /// Reference document (repeatable)
    #[arg(short, long = "context")]
    pub contexts: Vec<PathBuf>,

    #[command(flatten)]
    pub options: QueryOptions,
}

#[derive(Args)]
pub struct AskArgs {
    /// Plain-text document the question is about
    pub file: PathBuf,

    /// Question
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    #[command(flatten)]
    pub options: QueryOptions,
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Show cache statistics
    Stats,

    /// Delete entries older than the given age
    Evict {
        #[arg(long)]
        older_than_secs: u64,
    },

    /// Delete every entry
    Clear,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
