use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{BackendError, Completion, LlmBackend};

/// Placeholder text handed to stages once the retry budget is spent
pub const DEGRADED_RESPONSE: &str = "⚠️ Error generating response.";

/// Bounded retry with linear backoff.
///
/// A call gets `1 + max_retries` attempts. After failed attempt `n` (1-based)
/// the policy waits `n * base_delay` before trying again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Single attempt, no waiting
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay after failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    /// Returns the last error together with the number of attempts made.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<(T, u32), (BackendError, u32)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Backend call succeeded after retry");
                    }
                    return Ok((value, attempt));
                }
                Err(err) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts(),
                        error = %err,
                        "Backend call failed"
                    );
                    if attempt >= self.max_attempts() {
                        return Err((err, attempt));
                    }
                    sleep(self.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Invoke `backend` under `policy`, never failing.
///
/// Once the budget is exhausted the returned completion carries
/// [`DEGRADED_RESPONSE`] and `degraded = true`.
pub async fn complete_with_retry(
    backend: &dyn LlmBackend,
    prompt: &str,
    policy: &RetryPolicy,
) -> Completion {
    match policy.execute(|| backend.invoke(prompt)).await {
        Ok((text, attempts)) => Completion::new(text, attempts),
        Err((err, attempts)) => {
            warn!(
                backend = backend.name(),
                attempts,
                error = %err,
                "Backend retry budget exhausted, degrading"
            );
            Completion::degraded(DEGRADED_RESPONSE.to_string(), attempts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedBackend;

    #[test]
    fn test_linear_delay() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(3000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4500));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let backend = ScriptedBackend::new("test").with_response("hello");
        let completion = complete_with_retry(&backend, "prompt", &RetryPolicy::no_retry()).await;

        assert_eq!(completion.text, "hello");
        assert!(!completion.degraded);
        assert_eq!(completion.attempts, 1);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let backend = ScriptedBackend::new("test")
            .with_failure(BackendError::Unreachable("connection refused".into()))
            .with_response("recovered");
        let policy = RetryPolicy::new(2, Duration::ZERO);

        let completion = complete_with_retry(&backend, "prompt", &policy).await;

        assert_eq!(completion.text, "recovered");
        assert!(!completion.degraded);
        assert_eq!(completion.attempts, 2);
    }

    #[tokio::test]
    async fn test_exhausted_budget_degrades() {
        let backend = ScriptedBackend::new("test")
            .with_failure(BackendError::Timeout(Duration::from_secs(1)))
            .with_failure(BackendError::Timeout(Duration::from_secs(1)))
            .with_failure(BackendError::Timeout(Duration::from_secs(1)))
            .with_response("too late");
        let policy = RetryPolicy::new(2, Duration::ZERO);

        let completion = complete_with_retry(&backend, "prompt", &policy).await;

        assert!(completion.degraded);
        assert_eq!(completion.text, DEGRADED_RESPONSE);
        assert_eq!(completion.attempts, 3);
        assert_eq!(backend.calls(), 3);
    }
}
