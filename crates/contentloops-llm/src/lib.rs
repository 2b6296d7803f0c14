mod ollama;
mod output;
mod retry;
mod scripted;
pub mod tags;
mod traits;

pub use ollama::OllamaBackend;
pub use output::{Completion, Staged};
pub use retry::{complete_with_retry, RetryPolicy, DEGRADED_RESPONSE};
pub use scripted::ScriptedBackend;
pub use traits::{BackendConfig, BackendError, LlmBackend};
