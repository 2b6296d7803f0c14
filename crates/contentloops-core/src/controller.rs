use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use contentloops_critic::{EvaluationOutput, Evaluator, MIN_CONTENT_CHARS};
use contentloops_docs::{DocumentExporter, Retriever};
use contentloops_llm::{LlmBackend, RetryPolicy};
use contentloops_logging::{LogEvent, Logger};
use contentloops_writer::{
    Generator, PlanOutput, Planner, RunRequest, RunRequestBuilder, DEFAULT_TOP_K,
};

use crate::{IterationState, RunError, RunOutcome, RunStatus};

/// Orchestrates plan → {generate → evaluate}* → finalize
pub struct RefinementController<'a> {
    writer: &'a dyn LlmBackend,
    critic: &'a dyn LlmBackend,
    retriever: Option<&'a dyn Retriever>,
    exporter: Option<&'a dyn DocumentExporter>,
    retry: RetryPolicy,
    top_k: usize,
    logger: Arc<Logger>,
}

impl<'a> RefinementController<'a> {
    pub fn new(writer: &'a dyn LlmBackend, critic: &'a dyn LlmBackend, logger: Arc<Logger>) -> Self {
        Self {
            writer,
            critic,
            retriever: None,
            exporter: None,
            retry: RetryPolicy::default(),
            top_k: DEFAULT_TOP_K,
            logger,
        }
    }

    pub fn with_retriever(mut self, retriever: &'a dyn Retriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_exporter(mut self, exporter: &'a dyn DocumentExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Validate a request and run it
    pub async fn run_builder(&self, builder: RunRequestBuilder) -> Result<RunOutcome, RunError> {
        let request = builder.build()?;
        Ok(self.run(&request).await)
    }

    /// Run the refinement loop to completion. Stage failures degrade, they never abort.
    pub async fn run(&self, request: &RunRequest) -> RunOutcome {
        self.logger.log(&LogEvent::RunStarted {
            request: request.user_request().to_string(),
            language: request.language().to_string(),
            topic: request.topic().to_string(),
            max_iterations: request.max_iterations(),
            pass_threshold: request.pass_threshold(),
        });

        let mut state = IterationState::new(request.max_iterations(), request.pass_threshold());
        let plan = self.run_plan(request).await;

        let status = loop {
            if let Some(status) = self.run_iteration(request, &plan, &mut state).await {
                break status;
            }
            debug!(
                iteration = state.iteration,
                continuing = state.should_continue(),
                "Continuing to next iteration"
            );
        };

        if status == RunStatus::MaxIterationsReached {
            self.logger.log(&LogEvent::MaxIterationsReached {
                iterations: state.iteration,
            });
        }

        self.finalize(status, plan, state)
    }

    async fn run_plan(&self, request: &RunRequest) -> PlanOutput {
        let started = Instant::now();
        let mut planner = Planner::new(self.writer, self.retry).with_top_k(self.top_k);
        if let Some(retriever) = self.retriever {
            planner = planner.with_retriever(retriever);
        }

        let staged = planner.plan(request).await;
        self.logger.log(&LogEvent::PlanCompleted {
            degraded: staged.degraded,
            context_snippets: staged.output.context.len(),
            duration_secs: started.elapsed().as_secs_f64(),
        });
        staged.into_inner()
    }

    /// Run one generate + evaluate pair.
    /// Returns Some(status) if the run should finalize, None to continue.
    async fn run_iteration(
        &self,
        request: &RunRequest,
        plan: &PlanOutput,
        state: &mut IterationState,
    ) -> Option<RunStatus> {
        self.logger.log(&LogEvent::GeneratorStarted {
            iteration: state.iteration + 1,
        });

        let started = Instant::now();
        let generation = Generator::new(self.writer, self.retry)
            .generate(request, plan, &state.feedback)
            .await;
        state.increment_iteration();
        let iteration = state.iteration;
        let generation_degraded = generation.degraded;
        let generation = generation.into_inner();

        self.logger.log(&LogEvent::GeneratorCompleted {
            iteration,
            content_chars: generation.trimmed_len(),
            degraded: generation_degraded,
            duration_secs: started.elapsed().as_secs_f64(),
        });

        self.logger.log(&LogEvent::EvaluatorStarted { iteration });
        let gated = generation.trimmed_len() < MIN_CONTENT_CHARS;
        let (evaluation, evaluation_degraded) = if gated {
            warn!(
                iteration,
                chars = generation.trimmed_len(),
                "Content below minimum length, skipping critic"
            );
            (EvaluationOutput::too_short(), false)
        } else {
            let staged = Evaluator::new(self.critic, self.retry)
                .evaluate(&generation, request)
                .await;
            let degraded = staged.degraded;
            (staged.into_inner(), degraded)
        };

        self.logger.log(&LogEvent::EvaluatorCompleted {
            iteration,
            score: evaluation.score,
            feedback: evaluation.feedback.clone(),
            degraded: evaluation_degraded,
            gated,
        });

        if state.consider(evaluation.score, &generation.content) {
            self.logger.log(&LogEvent::BestResultUpdated {
                iteration,
                score: evaluation.score,
            });
        }

        state.push_entry(
            generation.rationale,
            evaluation.rationale,
            evaluation.score,
            evaluation.feedback.clone(),
        );
        let status = state.finish_status(evaluation.score, &generation.content);
        state.set_feedback(evaluation.feedback);
        status
    }

    fn finalize(&self, status: RunStatus, plan: PlanOutput, state: IterationState) -> RunOutcome {
        let iterations = state.iteration;
        let duration = state.total_duration();
        let (best, thinking_log) = state.into_parts();
        let best = best.unwrap_or_default();

        let export_path = self.export(&best.content, best.score);

        info!(
            iterations,
            final_score = best.score,
            best_iteration = best.iteration,
            passed = status == RunStatus::Passed,
            "Run completed"
        );
        self.logger.log(&LogEvent::RunCompleted {
            iterations,
            final_score: best.score,
            best_iteration: best.iteration,
            passed: status == RunStatus::Passed,
            duration_secs: duration.as_secs_f64(),
        });

        RunOutcome {
            status,
            iterations,
            final_content: best.content,
            final_score: best.score,
            best_iteration: best.iteration,
            plan,
            thinking_log,
            export_path,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    fn export(&self, content: &str, score: f64) -> Option<PathBuf> {
        let exporter = self.exporter?;
        match exporter.export(content, Some(score)) {
            Ok(path) => {
                self.logger.log(&LogEvent::ExportCompleted { path: path.clone() });
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "Export failed, keeping result");
                self.logger.log(&LogEvent::ExportFailed {
                    error: e.to_string(),
                });
                None
            }
        }
    }
}
