//! Docquery Core Library
//!
//! A resilient query pipeline for document analysis against remote LLM services.
//!
//! # Features
//! - Response cache keyed by normalized request fingerprints (SQLite or in-memory)
//! - Size-aware chunking of oversized documents with order-preserving aggregation
//! - Retry ladder with exponential backoff and model tier fallback
//! - Cancellation of backoff waits and in-flight calls
//! - Typed results carrying provenance (`model_used`, `degraded`, `cache_hit`)

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod llm;
pub mod query;

pub use cache::{CacheEntry, CacheStats, MemoryCacheStore, ResponseCache, SqliteCacheStore};
pub use config::{Config, EngineConfig, LLMServiceConfig};
pub use engine::{ResilientQueryEngine, RetryPolicy};
pub use error::{DocQueryError, FailureKind, InvokeError, QueryError, Result};
pub use index::{Chunk, Chunker};
pub use llm::{
    CharRatioEstimator, HttpModelInvoker, MetricsSnapshot, ModelInvoker, RawResponse,
    TokenEstimator,
};
pub use query::{
    Analysis, AttemptOutcome, AttemptRecord, ComplianceIssue, ContextRef, Purpose,
    QueryFingerprint, QueryRequest, QueryResult, ResponsePayload,
};
pub use tokio_util::sync::CancellationToken;

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "docquery";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "docquery";
