//! HTTP model invoker for OpenAI-compatible services (Groq, vLLM, OpenAI, etc.)

use super::invoker::{ModelInvoker, RawResponse};
use crate::config::LLMServiceConfig;
use crate::error::{InvokeError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Chat message for completion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// API metrics for monitoring
#[derive(Debug, Default)]
pub struct APIMetrics {
    pub total_requests: AtomicU64,
    pub total_errors: AtomicU64,
    pub rate_limited: AtomicU64,
    pub total_latency_ms: AtomicU64,
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub rate_limited: u64,
    pub avg_latency_ms: f64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    completion_tokens: Option<u32>,
}

/// OpenAI-compatible chat completions client
pub struct HttpModelInvoker {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
    metrics: APIMetrics,
}

impl HttpModelInvoker {
    /// Create new invoker from configuration.
    ///
    /// Only the connect timeout is set here; the engine enforces the per-call deadline.
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            config,
            metrics: APIMetrics::default(),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(LLMServiceConfig::default())
    }

    /// Get current API metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        let total = self.metrics.total_requests.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests: total,
            total_errors: self.metrics.total_errors.load(Ordering::Relaxed),
            rate_limited: self.metrics.rate_limited.load(Ordering::Relaxed),
            avg_latency_ms: if total > 0 {
                self.metrics.total_latency_ms.load(Ordering::Relaxed) as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.url.trim_end_matches('/')
        )
    }

    async fn send(
        &self,
        model_id: &str,
        payload: &str,
        max_output_tokens: u32,
    ) -> std::result::Result<RawResponse, InvokeError> {
        let request = ChatRequest {
            model: model_id,
            messages: vec![ChatMessage::user(payload)],
            temperature: self.config.temperature,
            max_tokens: max_output_tokens,
        };

        let mut req = self.http_client.post(self.endpoint()).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req.send().await.map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_ms(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(InvokeError::from_http_status(
                status.as_u16(),
                &body,
                retry_after,
            ));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                InvokeError::Fatal(format!("Invalid response body: {}", e))
            } else {
                classify_transport_error(e)
            }
        })?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InvokeError::Transient("No response from LLM".to_string()))?;

        Ok(RawResponse {
            text: choice.message.content,
            model: chat_response.model.unwrap_or_else(|| model_id.to_string()),
            output_tokens: chat_response.usage.and_then(|u| u.completion_tokens),
        })
    }
}

#[async_trait]
impl ModelInvoker for HttpModelInvoker {
    async fn call(
        &self,
        model_id: &str,
        payload: &str,
        max_output_tokens: u32,
    ) -> std::result::Result<RawResponse, InvokeError> {
        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let result = self.send(model_id, payload, max_output_tokens).await;

        match &result {
            Err(InvokeError::RateLimited { .. }) => {
                self.metrics.rate_limited.fetch_add(1, Ordering::Relaxed);
                self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
            }
            Ok(_) => {}
        }

        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics
            .total_latency_ms
            .fetch_add(elapsed, Ordering::Relaxed);

        result
    }
}

/// Network-level failures are worth retrying; request construction failures are not
fn classify_transport_error(e: reqwest::Error) -> InvokeError {
    if e.is_builder() {
        InvokeError::Fatal(format!("Invalid request: {}", e))
    } else {
        InvokeError::Transient(format!("Request failed: {}", e))
    }
}

/// Parse a `Retry-After` header given in seconds
fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let secs: f64 = raw.trim().parse().ok()?;
    (secs >= 0.0).then(|| (secs * 1000.0) as u64)
}
