use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use contentloops_core::{RefinementController, RunError, RunStatus};
use contentloops_critic::{FAIL_SOFT_SCORE, TOO_SHORT_FEEDBACK};
use contentloops_docs::{MarkdownExporter, RetrievalError, Retriever};
use contentloops_llm::{BackendError, RetryPolicy, ScriptedBackend};
use contentloops_logging::Logger;
use contentloops_writer::{RunRequest, ValidationError, FALLBACK_CONTENT};
use tempfile::TempDir;

const BODY: &str = "Oranges, guava and kiwi are rich in vitamin C, which helps the immune system and iron absorption. Eat one serving every day.";

fn draft(label: &str) -> String {
    format!(
        "<thinking>reasoning for {label}</thinking>\n<content>\n{label}: {BODY}\n#health\n</content>\nCONTENT_END"
    )
}

fn verdict(score: f64, feedback: &str) -> String {
    format!(
        "<thinking>checked {score}</thinking>\n<result>\n{{\"score\": {score}, \"feedback\": \"{feedback}\"}}\n</result>"
    )
}

fn writer_with_drafts(count: usize) -> ScriptedBackend {
    let backend = ScriptedBackend::new("writer")
        .with_response("<thinking>who reads this</thinking>\n1. LANGUAGE: english");
    for i in 1..=count {
        backend.push(Ok(draft(&format!("draft {}", i))));
    }
    backend
}

fn critic_with_scores(scores: &[f64]) -> ScriptedBackend {
    let backend = ScriptedBackend::new("critic");
    for (i, score) in scores.iter().enumerate() {
        backend.push(Ok(verdict(*score, &format!("feedback {}", i + 1))));
    }
    backend
}

fn request(threshold: f64, max_iterations: usize) -> RunRequest {
    RunRequest::builder("Write a post about vitamin C")
        .pass_threshold(threshold)
        .max_iterations(max_iterations)
        .enable_search(false)
        .build()
        .unwrap()
}

fn controller<'a>(writer: &'a ScriptedBackend, critic: &'a ScriptedBackend) -> RefinementController<'a> {
    RefinementController::new(writer, critic, Arc::new(Logger::silent()))
        .with_retry_policy(RetryPolicy::no_retry())
}

#[tokio::test]
async fn test_stops_once_threshold_is_met() {
    let writer = writer_with_drafts(3);
    let critic = critic_with_scores(&[0.5, 0.85, 0.6]);

    let outcome = controller(&writer, &critic).run(&request(0.8, 3)).await;

    assert_eq!(outcome.status, RunStatus::Passed);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.best_iteration, 2);
    assert!((outcome.final_score - 0.85).abs() < 1e-9);
    assert!(outcome.final_content.starts_with("draft 2:"));
    assert_eq!(outcome.thinking_log.len(), 2);
    assert_eq!(critic.calls(), 2);
    // plan + two drafts
    assert_eq!(writer.calls(), 3);
}

#[tokio::test]
async fn test_runs_to_cap_and_keeps_best() {
    let writer = writer_with_drafts(3);
    let critic = critic_with_scores(&[0.5, 0.6, 0.7]);

    let outcome = controller(&writer, &critic).run(&request(0.9, 3)).await;

    assert_eq!(outcome.status, RunStatus::MaxIterationsReached);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(outcome.iterations, 3);
    assert_eq!(outcome.best_iteration, 3);
    assert!((outcome.final_score - 0.7).abs() < 1e-9);
    assert!(outcome.final_content.starts_with("draft 3:"));

    let iterations: Vec<usize> = outcome.thinking_log.iter().map(|e| e.iteration).collect();
    assert_eq!(iterations, vec![1, 2, 3]);
    assert_eq!(outcome.thinking_log[0].generator_rationale, "reasoning for draft 1");
    assert_eq!(outcome.thinking_log[0].evaluator_rationale, "checked 0.5");
}

#[tokio::test]
async fn test_best_result_is_not_the_last_draft() {
    let writer = writer_with_drafts(3);
    let critic = critic_with_scores(&[0.4, 0.75, 0.5]);

    let outcome = controller(&writer, &critic).run(&request(0.9, 3)).await;

    assert_eq!(outcome.best_iteration, 2);
    assert!(outcome.final_content.starts_with("draft 2:"));
}

#[tokio::test]
async fn test_ties_keep_earlier_iteration() {
    let writer = writer_with_drafts(2);
    let critic = critic_with_scores(&[0.6, 0.6]);

    let outcome = controller(&writer, &critic).run(&request(0.9, 2)).await;

    assert_eq!(outcome.best_iteration, 1);
    assert!(outcome.final_content.starts_with("draft 1:"));
}

#[tokio::test]
async fn test_feedback_reaches_next_generation() {
    let writer = writer_with_drafts(2);
    let critic = critic_with_scores(&[0.3, 0.4]);

    controller(&writer, &critic).run(&request(0.9, 2)).await;

    let prompts = writer.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(!prompts[1].contains("feedback 1"));
    assert!(prompts[2].contains("feedback 1"));
}

#[tokio::test]
async fn test_short_content_skips_critic() {
    let writer = ScriptedBackend::new("writer")
        .with_response("plan")
        .with_response("<content>0123456789</content>");
    let critic = critic_with_scores(&[1.0]);

    let outcome = controller(&writer, &critic).run(&request(0.8, 1)).await;

    assert_eq!(critic.calls(), 0);
    assert_eq!(outcome.final_score, 0.0);
    assert_eq!(outcome.final_content, "0123456789");
    assert_eq!(outcome.thinking_log[0].feedback, TOO_SHORT_FEEDBACK);
    assert_eq!(outcome.status, RunStatus::MaxIterationsReached);
}

#[tokio::test]
async fn test_high_score_on_short_content_does_not_pass() {
    // Exactly 100 characters: evaluated, but too short to pass
    let writer = ScriptedBackend::new("writer")
        .with_response("plan")
        .with_response(format!("<content>{}</content>", "a".repeat(100)));
    let critic = critic_with_scores(&[0.95]);

    let outcome = controller(&writer, &critic).run(&request(0.8, 1)).await;

    assert_eq!(critic.calls(), 1);
    assert!((outcome.final_score - 0.95).abs() < 1e-9);
    assert_eq!(outcome.status, RunStatus::MaxIterationsReached);
}

#[tokio::test]
async fn test_critic_outage_is_fail_soft() {
    let writer = writer_with_drafts(3);
    let critic = ScriptedBackend::new("critic");

    let outcome = controller(&writer, &critic).run(&request(0.8, 3)).await;

    assert_eq!(critic.calls(), 3);
    assert_eq!(outcome.iterations, 3);
    assert_eq!(outcome.final_score, FAIL_SOFT_SCORE);
    assert_eq!(outcome.best_iteration, 1);
    assert_eq!(outcome.status, RunStatus::MaxIterationsReached);
}

#[tokio::test]
async fn test_total_outage_still_returns_content() {
    let writer = ScriptedBackend::new("writer");
    let critic = ScriptedBackend::new("critic");

    let outcome = controller(&writer, &critic).run(&request(0.8, 2)).await;

    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.final_score, 0.0);
    assert_eq!(outcome.final_content, FALLBACK_CONTENT);
    assert!(!outcome.plan.plan.is_empty());
    assert_eq!(critic.calls(), 0);
}

#[tokio::test]
async fn test_retries_recover_from_transient_failure() {
    let writer = ScriptedBackend::new("writer")
        .with_response("plan")
        .with_failure(BackendError::Unreachable("connection reset".into()))
        .with_response(draft("draft 1"));
    let critic = critic_with_scores(&[0.9]);

    let outcome = RefinementController::new(&writer, &critic, Arc::new(Logger::silent()))
        .with_retry_policy(RetryPolicy::new(1, std::time::Duration::ZERO))
        .run(&request(0.8, 1))
        .await;

    assert_eq!(outcome.status, RunStatus::Passed);
    assert!(outcome.final_content.starts_with("draft 1:"));
}

#[tokio::test]
async fn test_final_score_is_bounded() {
    let writer = writer_with_drafts(1);
    let critic = ScriptedBackend::new("critic").with_response("score: 7.5, feedback: \"great\"");

    let outcome = controller(&writer, &critic).run(&request(0.8, 1)).await;

    assert_eq!(outcome.final_score, 1.0);
    assert!(outcome.is_passed());
}

#[tokio::test]
async fn test_exports_best_content() {
    let dir = TempDir::new().unwrap();
    let exporter = MarkdownExporter::new(dir.path().join("outputs"));
    let writer = writer_with_drafts(2);
    let critic = critic_with_scores(&[0.7, 0.5]);

    let outcome = controller(&writer, &critic)
        .with_exporter(&exporter)
        .run(&request(0.9, 2))
        .await;

    let path = outcome.export_path.expect("export path");
    let written = fs::read_to_string(path).unwrap();
    assert!(written.starts_with("<!-- score: 0.70 -->"));
    assert!(written.contains("draft 1:"));
}

#[tokio::test]
async fn test_export_failure_does_not_change_result() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let exporter = MarkdownExporter::new(blocker);
    let writer = writer_with_drafts(1);
    let critic = critic_with_scores(&[0.9]);

    let outcome = controller(&writer, &critic)
        .with_exporter(&exporter)
        .run(&request(0.8, 1))
        .await;

    assert!(outcome.export_path.is_none());
    assert!(outcome.is_passed());
    assert!((outcome.final_score - 0.9).abs() < 1e-9);
}

struct CountingRetriever {
    calls: AtomicUsize,
}

impl Retriever for CountingRetriever {
    fn retrieve(&self, _query: &str, top_k: usize) -> Result<Vec<String>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["Kiwi has more vitamin C than oranges.".to_string(); top_k.min(2)])
    }
}

#[tokio::test]
async fn test_search_toggle_controls_retrieval() {
    let retriever = CountingRetriever {
        calls: AtomicUsize::new(0),
    };

    let writer = writer_with_drafts(1);
    let critic = critic_with_scores(&[0.9]);
    let disabled = controller(&writer, &critic)
        .with_retriever(&retriever)
        .run(&request(0.8, 1))
        .await;
    assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
    assert!(disabled.plan.context.is_empty());

    let writer = writer_with_drafts(1);
    let critic = critic_with_scores(&[0.9]);
    let enabled_request = RunRequest::builder("Write a post about vitamin C")
        .max_iterations(1)
        .build()
        .unwrap();
    let enabled = controller(&writer, &critic)
        .with_retriever(&retriever)
        .run(&enabled_request)
        .await;
    assert_eq!(retriever.calls.load(Ordering::SeqCst), 1);
    assert_eq!(enabled.plan.context.len(), 2);
    assert!(writer.prompts()[1].contains("Kiwi has more vitamin C"));
}

#[tokio::test]
async fn test_invalid_request_is_rejected_before_any_call() {
    let writer = writer_with_drafts(1);
    let critic = critic_with_scores(&[0.9]);

    let result = controller(&writer, &critic)
        .run_builder(RunRequest::builder("post").pass_threshold(1.5))
        .await;

    assert!(matches!(
        result,
        Err(RunError::Validation(ValidationError::ThresholdOutOfRange(_)))
    ));
    assert_eq!(writer.calls(), 0);
}

#[tokio::test]
async fn test_outcome_serializes_status() {
    let writer = writer_with_drafts(1);
    let critic = critic_with_scores(&[0.9]);

    let outcome = controller(&writer, &critic).run(&request(0.8, 1)).await;
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["status"], "passed");
    assert_eq!(json["iterations"], 1);
    assert_eq!(json["thinking_log"][0]["iteration"], 1);
}
