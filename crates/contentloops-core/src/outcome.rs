use contentloops_writer::PlanOutput;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ThinkingLogEntry;

/// Why the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// A draft met the pass threshold
    Passed,
    /// Hit the iteration cap first
    MaxIterationsReached,
}

/// The final result of a refinement run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Generate + evaluate pairs executed
    pub iterations: usize,
    /// Content of the best-scoring draft
    pub final_content: String,
    pub final_score: f64,
    pub best_iteration: usize,
    pub plan: PlanOutput,
    pub thinking_log: Vec<ThinkingLogEntry>,
    /// Where the exporter wrote the document, if it did
    pub export_path: Option<PathBuf>,
    pub total_duration_secs: f64,
}

impl RunOutcome {
    pub fn is_passed(&self) -> bool {
        self.status == RunStatus::Passed
    }

    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Passed => 0,
            RunStatus::MaxIterationsReached => 1,
        }
    }
}
