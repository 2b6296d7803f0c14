use serde::{Deserialize, Serialize};

/// Result of the plan stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanOutput {
    /// Model rationale from the `<thinking>` block
    pub rationale: String,
    /// Plan text handed to every generate call
    pub plan: String,
    /// Untouched backend response
    pub raw: String,
    /// Snippets retrieved while planning
    pub context: Vec<String>,
}

/// Result of one generate call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Draft post
    pub content: String,
    /// Model rationale from the `<thinking>` block
    pub rationale: String,
    /// Untouched backend response
    pub raw: String,
}

impl GenerationOutput {
    /// Wrap plain text that did not come from the generator
    pub fn from_content(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            raw: content.clone(),
            content,
            rationale: String::new(),
        }
    }

    /// Character count of the trimmed content
    pub fn trimmed_len(&self) -> usize {
        self.content.trim().chars().count()
    }
}
