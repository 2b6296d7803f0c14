use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a single backend call
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Backend request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Backend configuration error: {0}")]
    ConfigError(String),

    #[error("No scripted response left")]
    ScriptExhausted,
}

/// Connection settings for a generation backend
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the model server
    pub base_url: String,
    /// Model tag to request
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Per-request timeout
    pub timeout: Duration,
}

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen3:1.7b";

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            timeout: Duration::from_secs(60),
        }
    }
}

impl BackendConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// The core abstraction for text-generation backends.
///
/// Implementations are stateless with respect to a run, so one instance can be
/// shared by every stage of every run.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Human-readable name of the backend (e.g., "ollama")
    fn name(&self) -> &str;

    /// Model identifier used for requests
    fn model(&self) -> &str;

    /// Send a prompt and return the raw text response
    async fn invoke(&self, prompt: &str) -> Result<String, BackendError>;

    /// Check if the backend service answers
    async fn is_available(&self) -> bool;
}
