//! LLM integration
//!
//! Token estimation, the [`ModelInvoker`] network seam with its HTTP
//! implementation, prompt assembly, and validation of raw model output.

mod client;
mod invoker;
pub mod prompt;
pub mod response;
pub mod tokens;

pub use client::{APIMetrics, ChatMessage, HttpModelInvoker, MetricsSnapshot};
pub use invoker::{ModelInvoker, RawResponse};
pub use prompt::{build_prompt, fit_context, ChunkPart, FittedContext};
pub use response::parse_payload;
pub use tokens::{CharRatioEstimator, TokenEstimator, CHARS_PER_TOKEN};
