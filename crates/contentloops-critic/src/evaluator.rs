use contentloops_llm::tags::extract_thinking;
use contentloops_llm::{complete_with_retry, LlmBackend, RetryPolicy, Staged};
use contentloops_writer::{GenerationOutput, RunRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::{CriteriaWeights, CriticPrompts, Verdict};

/// Shortest trimmed draft worth sending to the critic
pub const MIN_CONTENT_CHARS: usize = 100;

/// Score used when the scoring backend could not be reached
pub const FAIL_SOFT_SCORE: f64 = 0.3;

/// Feedback for drafts rejected by the length gate
pub const TOO_SHORT_FEEDBACK: &str =
    "Content is too short or empty. Write a complete post of at least 100 characters that follows the plan.";

const UNAVAILABLE_FEEDBACK: &str =
    "Evaluation unavailable: the scoring backend did not respond. Revise the draft against the plan and the request.";

/// Result of one evaluate call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutput {
    /// Always within [0, 1]
    pub score: f64,
    /// Never empty
    pub feedback: String,
    pub rationale: String,
    pub raw: String,
    /// Normalized weights presented to the scorer
    pub criteria: BTreeMap<String, f64>,
}

impl EvaluationOutput {
    /// Verdict for a draft that never reached the critic
    pub fn too_short() -> Self {
        Self {
            score: 0.0,
            feedback: TOO_SHORT_FEEDBACK.to_string(),
            rationale: String::new(),
            raw: String::new(),
            criteria: BTreeMap::new(),
        }
    }
}

/// Evaluate stage: scores a draft against weighted criteria
pub struct Evaluator<'a> {
    backend: &'a dyn LlmBackend,
    retry: RetryPolicy,
}

impl<'a> Evaluator<'a> {
    pub fn new(backend: &'a dyn LlmBackend, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Score a draft. Never fails: a backend outage yields [`FAIL_SOFT_SCORE`],
    /// an unparseable response yields 0.0.
    pub async fn evaluate(
        &self,
        generation: &GenerationOutput,
        request: &RunRequest,
    ) -> Staged<EvaluationOutput> {
        let weights = CriteriaWeights::resolve(request.criteria());
        let prompt =
            CriticPrompts::build_evaluation_prompt(&generation.content, request, &weights);

        debug!(
            prompt_len = prompt.len(),
            criteria = weights.len(),
            "Running critic evaluation"
        );
        let completion = complete_with_retry(self.backend, &prompt, &self.retry).await;

        if completion.degraded {
            warn!(
                attempts = completion.attempts,
                "Critic backend unavailable, using fail-soft score"
            );
            return Staged::fallback(EvaluationOutput {
                score: FAIL_SOFT_SCORE,
                feedback: UNAVAILABLE_FEEDBACK.to_string(),
                rationale: String::new(),
                raw: completion.text,
                criteria: weights.into_map(),
            });
        }

        let verdict = Verdict::parse(&completion.text);
        info!(
            score = verdict.score,
            source = ?verdict.source,
            "Critic completed"
        );

        Staged::completed(EvaluationOutput {
            score: verdict.score,
            feedback: verdict.feedback,
            rationale: extract_thinking(&completion.text),
            raw: completion.text,
            criteria: weights.into_map(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PARSE_FAILURE_FEEDBACK;
    use contentloops_llm::{BackendError, ScriptedBackend};

    fn draft() -> GenerationOutput {
        GenerationOutput::from_content("A".repeat(150))
    }

    fn request() -> RunRequest {
        RunRequest::builder("Post about tea").build().unwrap()
    }

    #[tokio::test]
    async fn test_evaluate_parses_verdict() {
        let backend = ScriptedBackend::new("critic").with_response(
            "<thinking>solid</thinking><result>{\"score\": 0.85, \"feedback\": \"Add a source\"}</result>",
        );
        let evaluator = Evaluator::new(&backend, RetryPolicy::no_retry());

        let staged = evaluator.evaluate(&draft(), &request()).await;

        assert!(!staged.degraded);
        assert!((staged.output.score - 0.85).abs() < 1e-9);
        assert_eq!(staged.output.feedback, "Add a source");
        assert_eq!(staged.output.rationale, "solid");
        assert_eq!(staged.output.criteria.len(), 6);
    }

    #[tokio::test]
    async fn test_backend_outage_is_fail_soft() {
        let backend = ScriptedBackend::new("critic")
            .with_failure(BackendError::Unreachable("connection refused".into()));
        let evaluator = Evaluator::new(&backend, RetryPolicy::no_retry());

        let staged = evaluator.evaluate(&draft(), &request()).await;

        assert!(staged.degraded);
        assert_eq!(staged.output.score, FAIL_SOFT_SCORE);
        assert!(!staged.output.feedback.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_response_fails_closed() {
        let backend = ScriptedBackend::new("critic").with_response("Looks good to me!");
        let evaluator = Evaluator::new(&backend, RetryPolicy::no_retry());

        let staged = evaluator.evaluate(&draft(), &request()).await;

        assert!(!staged.degraded);
        assert_eq!(staged.output.score, 0.0);
        assert_eq!(staged.output.feedback, PARSE_FAILURE_FEEDBACK);
    }

    #[tokio::test]
    async fn test_custom_criteria_reach_prompt() {
        let mut criteria = BTreeMap::new();
        criteria.insert("clarity".to_string(), 2.0);
        let request = RunRequest::builder("Post about tea")
            .criteria(criteria)
            .build()
            .unwrap();
        let backend = ScriptedBackend::new("critic").with_response("score: 0.5");
        let evaluator = Evaluator::new(&backend, RetryPolicy::no_retry());

        let staged = evaluator.evaluate(&draft(), &request).await;

        assert_eq!(staged.output.criteria.get("clarity"), Some(&1.0));
        assert!(backend.prompts()[0].contains("- clarity (100%)"));
    }
}
