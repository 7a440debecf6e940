//! Resilient query engine
//!
//! Turns a [`QueryRequest`] into a bounded number of model calls: cache first,
//! chunking for oversized input, a retry ladder with backoff across model
//! tiers, and a best-effort cache write of the aggregated answer.

mod aggregate;
mod locks;
mod retry;

pub use aggregate::{aggregate, merge_payloads, Aggregate, ChunkAnswer};
pub use locks::{FingerprintGuard, FingerprintLocks};
pub use retry::RetryPolicy;

use crate::cache::{CacheEntry, ResponseCache};
use crate::config::EngineConfig;
use crate::error::{FailureKind, InvokeError, QueryError, Result};
use crate::index::{Chunk, Chunker};
use crate::llm::{
    build_prompt, fit_context, parse_payload, CharRatioEstimator, ChunkPart, ModelInvoker,
    TokenEstimator,
};
use crate::query::{
    AttemptOutcome, AttemptRecord, Purpose, QueryFingerprint, QueryRequest, QueryResult,
    ResponsePayload,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of one chunk through the retry ladder
struct ChunkRun {
    index: usize,
    outcome: std::result::Result<ChunkAnswer, QueryError>,
    attempts: Vec<AttemptRecord>,
}

/// Orchestrates cache, chunking, retries and tier fallback.
///
/// Safe to share across concurrent callers; the only shared mutable state is
/// the cache handle and the per-fingerprint lock registry.
pub struct ResilientQueryEngine {
    config: Arc<EngineConfig>,
    invoker: Arc<dyn ModelInvoker>,
    cache: Arc<dyn ResponseCache>,
    estimator: Arc<dyn TokenEstimator>,
    locks: FingerprintLocks,
    policy: RetryPolicy,
}

impl ResilientQueryEngine {
    /// Create an engine with the default token estimator
    pub fn new(
        config: EngineConfig,
        invoker: Arc<dyn ModelInvoker>,
        cache: Arc<dyn ResponseCache>,
    ) -> Result<Self> {
        config.validate()?;
        let policy = RetryPolicy::from_config(&config);
        Ok(Self {
            config: Arc::new(config),
            invoker,
            cache,
            estimator: Arc::new(CharRatioEstimator),
            locks: FingerprintLocks::new(),
            policy,
        })
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    /// Models tried for this request, best first
    pub fn tier_ladder(&self, request: &QueryRequest) -> Vec<String> {
        let tiers = &self.config.model_tiers;
        match request.preferred_model() {
            Some(preferred) => match tiers.iter().position(|m| m == preferred) {
                Some(start) => tiers[start..].to_vec(),
                None => std::iter::once(preferred.to_string())
                    .chain(tiers.iter().cloned())
                    .collect(),
            },
            None => tiers.clone(),
        }
    }

    /// Output budget after applying the configured default
    pub fn output_budget(&self, request: &QueryRequest) -> u32 {
        request
            .max_output_tokens()
            .unwrap_or(self.config.max_output_tokens_default)
    }

    /// Cache key of a request
    pub fn fingerprint(&self, request: &QueryRequest) -> QueryFingerprint {
        let ladder = self.tier_ladder(request);
        let model = ladder.first().map(String::as_str).unwrap_or_default();
        QueryFingerprint::compute(request, model, self.output_budget(request))
    }

    /// Run a request to completion.
    ///
    /// Returns either a result (possibly degraded) or a typed failure; transport
    /// errors never escape. Cancelling `cancel` aborts any backoff wait or
    /// in-flight call and returns [`QueryError::Cancelled`].
    pub async fn run(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> std::result::Result<QueryResult, QueryError> {
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        if request.raw_text().trim().is_empty() {
            return Err(QueryError::InvalidRequest(
                "request text is empty".to_string(),
            ));
        }

        let fingerprint = self.fingerprint(request);

        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Cancelled while waiting for {}", fingerprint.short());
                return Err(QueryError::Cancelled);
            }
            guard = self.locks.acquire(&fingerprint) => guard,
        };

        if let Some(hit) = self.cached(&fingerprint) {
            return Ok(hit);
        }

        let result = self.compute(request, cancel).await?;
        self.store(&fingerprint, &result);
        Ok(result)
    }

    /// Read the cache, treating any storage failure or expired entry as a miss
    fn cached(&self, fingerprint: &QueryFingerprint) -> Option<QueryResult> {
        let entry = match self.cache.get(fingerprint) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tracing::debug!("Cache miss for {}", fingerprint.short());
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    "Cache read failed for {}, continuing without cache: {}",
                    fingerprint.short(),
                    e
                );
                return None;
            }
        };

        if let Some(ttl) = self.config.cache_ttl() {
            if entry.is_older_than(ttl, Utc::now()) {
                tracing::debug!("Cache entry for {} expired", fingerprint.short());
                return None;
            }
        }

        tracing::debug!("Cache hit for {}", fingerprint.short());
        Some(QueryResult {
            payload: entry.response_payload,
            model_used: entry.model_used,
            cache_hit: true,
            degraded: entry.degraded,
            token_cost: entry.token_cost,
            chunk_count: 0,
            chunks_failed: 0,
            attempts: Vec::new(),
        })
    }

    /// Best-effort write; failures are logged and swallowed
    fn store(&self, fingerprint: &QueryFingerprint, result: &QueryResult) {
        let entry = CacheEntry::new(
            fingerprint.clone(),
            result.payload.clone(),
            result.model_used.clone(),
            result.token_cost,
            result.degraded,
        );
        if let Err(e) = self.cache.put(&entry) {
            tracing::warn!("Failed to cache response for {}: {}", fingerprint.short(), e);
        }
    }

    async fn compute(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> std::result::Result<QueryResult, QueryError> {
        let ladder = self.tier_ladder(request);
        let max_output = self.output_budget(request);
        let purpose = request.purpose();

        let fitted = fit_context(
            request.context_refs(),
            self.estimator.as_ref(),
            self.config.context_token_budget,
            max_output,
        );
        if fitted.truncated {
            tracing::warn!(
                "Context truncated to {} of {} reference(s) to fit the token budget",
                fitted.refs.len(),
                request.context_refs().len()
            );
        }

        let text_cost = self.estimator.estimate(request.raw_text());
        let context_cost: usize = fitted
            .refs
            .iter()
            .map(|r| self.estimator.estimate(&r.text))
            .sum();
        let token_cost = text_cost + context_cost;

        let chunks = if text_cost > self.config.token_ceiling() {
            Chunker::new(self.config.max_chunk_chars).split(request.raw_text())
        } else {
            vec![Chunk {
                text: request.raw_text().to_string(),
                index: 0,
                position: 0,
            }]
        };
        let total = chunks.len();
        let concurrent = self.config.max_concurrent_chunks.min(total).max(1);

        if total > 1 {
            tracing::info!(
                "Dispatching {} chunks ({} concurrent, ~{} tokens)",
                total,
                concurrent,
                text_cost
            );
        }

        let mut runs: Vec<ChunkRun> = stream::iter(chunks)
            .map(|chunk| {
                let part = (total > 1).then_some(ChunkPart {
                    index: chunk.index,
                    total,
                });
                let prompt = build_prompt(purpose, &chunk.text, &fitted.refs, part);
                let ladder = &ladder;
                async move {
                    self.run_chunk(chunk.index, purpose, &prompt, ladder, max_output, cancel)
                        .await
                }
            })
            .buffer_unordered(concurrent)
            .collect()
            .await;

        runs.sort_by_key(|run| run.index);

        let mut attempts = Vec::new();
        let mut answers = Vec::new();
        let mut first_error = None;
        for run in runs {
            attempts.extend(run.attempts);
            match run.outcome {
                Ok(answer) => answers.push(answer),
                Err(QueryError::Cancelled) => {
                    tracing::info!("Run cancelled");
                    return Err(QueryError::Cancelled);
                }
                Err(e) => {
                    tracing::warn!("Chunk {} of {} failed: {}", run.index + 1, total, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        let chunks_failed = total - answers.len();
        let Some(merged) = aggregate(answers) else {
            return Err(first_error.unwrap_or_else(|| QueryError::Exhausted {
                last: FailureKind::Transient,
                message: "no chunk produced an answer".to_string(),
            }));
        };

        let degraded = merged.tier > 0 || chunks_failed > 0 || fitted.truncated;
        if degraded {
            tracing::warn!(
                "Degraded result: model={} failed_chunks={} truncated_context={}",
                merged.model_used,
                chunks_failed,
                fitted.truncated
            );
        }

        Ok(QueryResult {
            payload: merged.payload,
            model_used: merged.model_used,
            cache_hit: false,
            degraded,
            token_cost,
            chunk_count: total,
            chunks_failed,
            attempts,
        })
    }

    /// Drive one chunk through every tier of the ladder
    async fn run_chunk(
        &self,
        index: usize,
        purpose: Purpose,
        prompt: &str,
        ladder: &[String],
        max_output: u32,
        cancel: &CancellationToken,
    ) -> ChunkRun {
        let mut attempts = Vec::new();
        let mut last: Option<InvokeError> = None;

        for (tier, model) in ladder.iter().enumerate() {
            if tier > 0 {
                tracing::warn!(
                    "Falling back to tier {} ({}) for chunk {}",
                    tier,
                    model,
                    index + 1
                );
            }

            let mut wait_before_ms = 0;
            for attempt in 0..self.policy.attempts_per_tier {
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return ChunkRun { index, outcome: Err(QueryError::Cancelled), attempts };
                    }
                    result = self.attempt(purpose, model, prompt, max_output) => result,
                };

                let outcome = match &result {
                    Ok(_) => AttemptOutcome::Ok,
                    Err(e) => AttemptOutcome::from(e.kind()),
                };
                attempts.push(AttemptRecord {
                    chunk_index: index,
                    model_used: model.clone(),
                    tier,
                    attempt_number: attempt + 1,
                    wait_before_ms,
                    outcome,
                });

                let err = match result {
                    Ok(payload) => {
                        tracing::debug!(
                            "Chunk {} answered by {} (tier {}, attempt {})",
                            index + 1,
                            model,
                            tier,
                            attempt + 1
                        );
                        let answer = ChunkAnswer {
                            index,
                            payload,
                            model_used: model.clone(),
                            tier,
                        };
                        return ChunkRun {
                            index,
                            outcome: Ok(answer),
                            attempts,
                        };
                    }
                    Err(err) => err,
                };

                if err.kind() == FailureKind::Fatal {
                    tracing::warn!("Fatal error from {}, skipping tier: {}", model, err);
                    last = Some(err);
                    break;
                }
                if !self.policy.has_next_attempt(attempt) {
                    tracing::warn!("Retry budget exhausted for {}: {}", model, err);
                    last = Some(err);
                    break;
                }

                let delay = self.policy.delay_for_attempt(attempt, err.retry_after_ms());
                tracing::warn!(
                    "{} from {} (attempt {}/{}), retrying in {}ms",
                    err,
                    model,
                    attempt + 1,
                    self.policy.attempts_per_tier,
                    delay.as_millis()
                );
                last = Some(err);

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::info!("Cancelled during backoff for chunk {}", index + 1);
                        return ChunkRun { index, outcome: Err(QueryError::Cancelled), attempts };
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
                wait_before_ms = delay.as_millis() as u64;
            }
        }

        let error = match last {
            Some(err) => QueryError::Exhausted {
                last: err.kind(),
                message: err.to_string(),
            },
            None => QueryError::Exhausted {
                last: FailureKind::Transient,
                message: "no model tiers configured".to_string(),
            },
        };
        ChunkRun {
            index,
            outcome: Err(error),
            attempts,
        }
    }

    /// One call with the hard timeout applied, validated into a payload
    async fn attempt(
        &self,
        purpose: Purpose,
        model: &str,
        prompt: &str,
        max_output: u32,
    ) -> std::result::Result<ResponsePayload, InvokeError> {
        let timeout = self.config.call_timeout();
        let raw = tokio::time::timeout(timeout, self.invoker.call(model, prompt, max_output))
            .await
            .map_err(|_| {
                InvokeError::Transient(format!(
                    "call to {} timed out after {}s",
                    model,
                    timeout.as_secs()
                ))
            })??;
        parse_payload(purpose, &raw.text)
    }
}
