//! Configuration management

use crate::error::{DocQueryError, Result};
use crate::llm::tokens::CHARS_PER_TOKEN;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Query engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// LLM service configuration
    #[serde(default)]
    pub llm_service: LLMServiceConfig,
}

/// Query engine configuration.
///
/// Loaded once and handed to the engine behind an `Arc`; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model identifiers ordered from highest capability/cost to lowest
    #[serde(default = "default_model_tiers")]
    pub model_tiers: Vec<String>,

    /// Output token budget used when a request does not set one
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens_default: u32,

    /// Maximum characters per chunk sent in one call
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Shared rate-limit/transient attempt budget per tier
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts_per_tier: u32,

    /// First backoff delay; doubles on every further attempt
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Cache entries older than this are ignored on read
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,

    /// Upper bound for a single backoff wait
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Hard timeout for one network call
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// Estimated token cost above which a request is chunked
    #[serde(default)]
    pub single_call_token_ceiling: Option<usize>,

    /// Token budget for prompt context plus output
    #[serde(default = "default_context_token_budget")]
    pub context_token_budget: usize,

    /// Chunks dispatched concurrently
    #[serde(default = "default_max_concurrent_chunks")]
    pub max_concurrent_chunks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_tiers: default_model_tiers(),
            max_output_tokens_default: default_max_output_tokens(),
            max_chunk_chars: default_max_chunk_chars(),
            retry_attempts_per_tier: default_retry_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            cache_ttl_secs: None,
            max_backoff_ms: default_max_backoff_ms(),
            call_timeout_secs: default_call_timeout(),
            single_call_token_ceiling: None,
            context_token_budget: default_context_token_budget(),
            max_concurrent_chunks: default_max_concurrent_chunks(),
        }
    }
}

impl EngineConfig {
    /// Check the configuration is usable by the engine
    pub fn validate(&self) -> Result<()> {
        if self.model_tiers.is_empty() || self.model_tiers.iter().any(|m| m.trim().is_empty()) {
            return Err(DocQueryError::Config(
                "model_tiers must list at least one non-empty model id".to_string(),
            ));
        }
        if self.retry_attempts_per_tier == 0 {
            return Err(DocQueryError::Config(
                "retry_attempts_per_tier must be at least 1".to_string(),
            ));
        }
        if self.max_chunk_chars == 0 {
            return Err(DocQueryError::Config(
                "max_chunk_chars must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrent_chunks == 0 {
            return Err(DocQueryError::Config(
                "max_concurrent_chunks must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Estimated cost above which a request is split into chunks
    pub fn token_ceiling(&self) -> usize {
        self.single_call_token_ceiling
            .unwrap_or_else(|| self.max_chunk_chars.div_ceil(CHARS_PER_TOKEN))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }
}

fn default_model_tiers() -> Vec<String> {
    vec![
        "llama-3.3-70b-versatile".to_string(),
        "llama-3.1-8b-instant".to_string(),
    ]
}

fn default_max_output_tokens() -> u32 {
    500
}

fn default_max_chunk_chars() -> usize {
    6000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_call_timeout() -> u64 {
    60
}

fn default_context_token_budget() -> usize {
    3000
}

fn default_max_concurrent_chunks() -> usize {
    4
}

/// LLM service configuration for the HTTP model invoker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of an OpenAI-compatible chat completions service
    #[serde(default = "default_url")]
    pub url: String,

    /// API key (optional, for authenticated services)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: std::env::var("DOCQUERY_LLM_API_KEY")
                .or_else(|_| std::env::var("GROQ_API_KEY"))
                .ok(),
            timeout_secs: default_connect_timeout(),
            temperature: default_temperature(),
        }
    }
}

fn default_url() -> String {
    std::env::var("DOCQUERY_LLM_URL").unwrap_or_else(|_| "https://api.groq.com/openai".to_string())
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_temperature() -> f32 {
    0.3
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load config from an explicit path, falling back to defaults if it does not exist
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str::<Config>(&content)?
        } else {
            Config::default()
        };
        config.apply_env_overrides()?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Save config to path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Apply `DOCQUERY_*` environment overrides on top of file values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(tiers) = std::env::var("DOCQUERY_MODEL_TIERS") {
            self.engine.model_tiers = tiers
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }
        if let Some(v) = env_parse("DOCQUERY_MAX_CHUNK_CHARS")? {
            self.engine.max_chunk_chars = v;
        }
        if let Some(v) = env_parse("DOCQUERY_RETRY_ATTEMPTS")? {
            self.engine.retry_attempts_per_tier = v;
        }
        if let Some(v) = env_parse("DOCQUERY_BASE_BACKOFF_MS")? {
            self.engine.base_backoff_ms = v;
        }
        if let Some(v) = env_parse("DOCQUERY_CACHE_TTL_SECS")? {
            self.engine.cache_ttl_secs = Some(v);
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DocQueryError::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(None),
    }
}
