//! Error types for docquery

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using DocQueryError
pub type Result<T> = std::result::Result<T, DocQueryError>;

/// Error type alias for convenience
pub type Error = DocQueryError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
    pub const NO_ANSWER: i32 = 4;
}

/// Infrastructure error: storage, configuration, I/O, client construction
#[derive(Debug, Error)]
pub enum DocQueryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl DocQueryError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound(_) => exit_codes::NOT_FOUND,
            Self::InvalidInput(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}

/// Classification of a single failed model call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    Transient,
    Fatal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limited"),
            Self::Transient => write!(f, "transient error"),
            Self::Fatal => write!(f, "fatal error"),
        }
    }
}

/// Failure reported by a [`crate::llm::ModelInvoker`] for one call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvokeError {
    #[error("Rate limit exceeded{}", .retry_after_ms.map(|ms| format!(", retry after {}ms", ms)).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl InvokeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::Transient(_) => FailureKind::Transient,
            Self::Fatal(_) => FailureKind::Fatal,
        }
    }

    /// Server-supplied wait hint, if any
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }

    /// Classify an HTTP status code and body
    pub fn from_http_status(status: u16, body: &str, retry_after_ms: Option<u64>) -> Self {
        match status {
            429 => Self::RateLimited {
                retry_after_ms: retry_after_ms.or_else(|| extract_retry_after(body)),
            },
            408 | 409 | 500..=599 => Self::Transient(format!("HTTP {}: {}", status, body)),
            _ => Self::Fatal(format!("HTTP {}: {}", status, body)),
        }
    }
}

/// Try to extract a retry-after value (seconds) from an error body, in milliseconds
fn extract_retry_after(body: &str) -> Option<u64> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    let secs = json
        .get("error")
        .and_then(|e| e.get("retry_after"))
        .or_else(|| json.get("retry_after"))
        .and_then(|v| v.as_f64())?;
    Some((secs * 1000.0) as u64)
}

/// Terminal failure of a query run
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("All model tiers exhausted (last failure: {last}): {message}")]
    Exhausted { last: FailureKind, message: String },

    #[error("Query cancelled")]
    Cancelled,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl QueryError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidRequest(_) => exit_codes::INVALID_INPUT,
            Self::Exhausted { .. } | Self::Cancelled => exit_codes::NO_ANSWER,
        }
    }
}
