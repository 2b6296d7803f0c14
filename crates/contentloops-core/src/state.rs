use contentloops_critic::MIN_CONTENT_CHARS;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::RunStatus;

/// Highest-scoring draft seen so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestResult {
    pub score: f64,
    pub content: String,
    /// 1-based iteration that produced it
    pub iteration: usize,
}

/// One completed generate + evaluate pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingLogEntry {
    pub iteration: usize,
    pub generator_rationale: String,
    pub evaluator_rationale: String,
    pub score: f64,
    pub feedback: String,
}

/// Mutable state of one run, owned by the controller
#[derive(Debug, Clone)]
pub struct IterationState {
    /// Completed generate calls
    pub iteration: usize,
    /// Feedback handed to the next generate call
    pub feedback: String,
    best: Option<BestResult>,
    thinking_log: Vec<ThinkingLogEntry>,
    /// Set once the run has decided to finalize
    finished: Option<RunStatus>,
    max_iterations: usize,
    pass_threshold: f64,
    started_at: Instant,
}

impl IterationState {
    pub fn new(max_iterations: usize, pass_threshold: f64) -> Self {
        Self {
            iteration: 0,
            feedback: String::new(),
            best: None,
            thinking_log: Vec::new(),
            finished: None,
            max_iterations,
            pass_threshold,
            started_at: Instant::now(),
        }
    }

    pub fn increment_iteration(&mut self) {
        self.iteration += 1;
    }

    pub fn set_feedback(&mut self, feedback: String) {
        self.feedback = feedback;
    }

    /// Record a scored draft. The first draft is always taken; later ones only on a
    /// strictly higher score. Returns whether the best result moved.
    pub fn consider(&mut self, score: f64, content: &str) -> bool {
        let improved = match &self.best {
            Some(best) => score > best.score,
            None => true,
        };
        if improved {
            self.best = Some(BestResult {
                score,
                content: content.to_string(),
                iteration: self.iteration,
            });
        }
        improved
    }

    /// Append the log entry for the current iteration
    pub fn push_entry(
        &mut self,
        generator_rationale: String,
        evaluator_rationale: String,
        score: f64,
        feedback: String,
    ) {
        self.thinking_log.push(ThinkingLogEntry {
            iteration: self.iteration,
            generator_rationale,
            evaluator_rationale,
            score,
            feedback,
        });
    }

    /// Decide whether the run ends after the latest pair and record the decision
    pub fn finish_status(&mut self, score: f64, content: &str) -> Option<RunStatus> {
        let status = if score >= self.pass_threshold
            && content.trim().chars().count() > MIN_CONTENT_CHARS
        {
            Some(RunStatus::Passed)
        } else if self.iteration >= self.max_iterations {
            Some(RunStatus::MaxIterationsReached)
        } else {
            None
        };
        self.finished = status;
        status
    }

    /// Whether another generate call should follow
    pub fn should_continue(&self) -> bool {
        self.finished.is_none()
    }

    /// The recorded finalize decision, if any
    pub fn status(&self) -> Option<RunStatus> {
        self.finished
    }

    pub fn best(&self) -> Option<&BestResult> {
        self.best.as_ref()
    }

    pub fn thinking_log(&self) -> &[ThinkingLogEntry] {
        &self.thinking_log
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn into_parts(self) -> (Option<BestResult>, Vec<ThinkingLogEntry>) {
        (self.best, self.thinking_log)
    }
}
