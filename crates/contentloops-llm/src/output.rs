use serde::{Deserialize, Serialize};

/// Text returned from a retried backend call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Response text, or the degraded diagnostic string
    pub text: String,
    /// True when every attempt failed and `text` is a diagnostic placeholder
    pub degraded: bool,
    /// Number of backend calls made
    pub attempts: u32,
}

impl Completion {
    pub fn new(text: String, attempts: u32) -> Self {
        Self {
            text,
            degraded: false,
            attempts,
        }
    }

    pub fn degraded(text: String, attempts: u32) -> Self {
        Self {
            text,
            degraded: true,
            attempts,
        }
    }
}

/// Output of a pipeline stage, tagged with whether it came from a fallback path
#[derive(Debug, Clone, PartialEq)]
pub struct Staged<T> {
    pub output: T,
    pub degraded: bool,
}

impl<T> Staged<T> {
    pub fn completed(output: T) -> Self {
        Self {
            output,
            degraded: false,
        }
    }

    pub fn fallback(output: T) -> Self {
        Self {
            output,
            degraded: true,
        }
    }

    pub fn into_inner(self) -> T {
        self.output
    }
}
