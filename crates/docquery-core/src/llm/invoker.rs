//! The network seam: one call to one named model

use crate::error::InvokeError;
use async_trait::async_trait;
use std::sync::Arc;

/// Unvalidated text returned by a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub text: String,
    /// Model identifier reported by the service (may differ from the requested alias)
    pub model: String,
    pub output_tokens: Option<u32>,
}

impl RawResponse {
    pub fn new(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            output_tokens: None,
        }
    }
}

/// Issues a single model call. Implementations classify every failure as
/// rate-limited, transient or fatal; they never retry on their own.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn call(
        &self,
        model_id: &str,
        payload: &str,
        max_output_tokens: u32,
    ) -> Result<RawResponse, InvokeError>;
}

#[async_trait]
impl<T: ModelInvoker + ?Sized> ModelInvoker for Arc<T> {
    async fn call(
        &self,
        model_id: &str,
        payload: &str,
        max_output_tokens: u32,
    ) -> Result<RawResponse, InvokeError> {
        (**self).call(model_id, payload, max_output_tokens).await
    }
}
