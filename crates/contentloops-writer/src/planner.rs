use contentloops_docs::Retriever;
use contentloops_llm::tags::{extract_thinking, strip_tag};
use contentloops_llm::{complete_with_retry, LlmBackend, RetryPolicy, Staged};
use tracing::{debug, info, warn};

use crate::{PlanOutput, RunRequest, WriterPrompts};

/// Snippets requested from the retriever per run
pub const DEFAULT_TOP_K: usize = 5;

/// Plan stage: runs once per run, before any iteration
pub struct Planner<'a> {
    backend: &'a dyn LlmBackend,
    retry: RetryPolicy,
    retriever: Option<&'a dyn Retriever>,
    top_k: usize,
}

impl<'a> Planner<'a> {
    pub fn new(backend: &'a dyn LlmBackend, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            retriever: None,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_retriever(mut self, retriever: &'a dyn Retriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Produce the plan. Never fails: a backend failure yields a locally built plan.
    pub async fn plan(&self, request: &RunRequest) -> Staged<PlanOutput> {
        let context = self.gather_context(request);
        let prompt = WriterPrompts::build_plan_prompt(request, &context);

        debug!(prompt_len = prompt.len(), context = context.len(), "Running planner");
        let completion = complete_with_retry(self.backend, &prompt, &self.retry).await;

        if completion.degraded {
            warn!("Planner backend unavailable, using fallback plan");
            return Staged::fallback(PlanOutput {
                rationale: String::new(),
                plan: WriterPrompts::build_fallback_plan(request),
                raw: completion.text,
                context,
            });
        }

        let raw = completion.text.trim().to_string();
        let rationale = extract_thinking(&raw);
        let plan = clean_plan(&raw);

        if plan.is_empty() {
            warn!("Planner returned no plan text, using fallback plan");
            return Staged::fallback(PlanOutput {
                rationale,
                plan: WriterPrompts::build_fallback_plan(request),
                raw,
                context,
            });
        }

        info!(plan_len = plan.len(), "Plan ready");
        Staged::completed(PlanOutput {
            rationale,
            plan,
            raw,
            context,
        })
    }

    /// One-shot retrieval; an error means an empty context for this run
    fn gather_context(&self, request: &RunRequest) -> Vec<String> {
        if !request.enable_search() {
            return Vec::new();
        }
        let Some(retriever) = self.retriever else {
            return Vec::new();
        };

        match retriever.retrieve(request.user_request(), self.top_k) {
            Ok(snippets) => {
                debug!(snippets = snippets.len(), "Retrieved context");
                snippets
            }
            Err(e) => {
                warn!(error = %e, "Context retrieval failed, planning without context");
                Vec::new()
            }
        }
    }
}

fn clean_plan(raw: &str) -> String {
    let without_thinking = strip_tag(&strip_tag(raw, "thinking"), "think");
    without_thinking
        .lines()
        .filter(|line| !line.contains("CHAIN OF THOUGHT"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentloops_docs::{CorpusRetriever, RetrievalError};
    use contentloops_llm::{BackendError, ScriptedBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRetriever {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Retriever for CountingRetriever {
        fn retrieve(&self, _query: &str, _top_k: usize) -> Result<Vec<String>, RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(RetrievalError::IoError(std::io::Error::other("index offline")))
            } else {
                Ok(vec!["retrieved fact".to_string()])
            }
        }
    }

    fn request(enable_search: bool) -> RunRequest {
        RunRequest::builder("Post about drinking water at work")
            .enable_search(enable_search)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_plan_extracts_rationale_and_plan() {
        let backend = ScriptedBackend::new("writer").with_response(
            "🧠 CHAIN OF THOUGHT - ORCHESTRATOR:\n<thinking>readers are busy</thinking>\n1. LANGUAGE: vietnamese\n2. MAIN TOPIC: hydration",
        );
        let planner = Planner::new(&backend, RetryPolicy::no_retry());

        let staged = planner.plan(&request(false)).await;

        assert!(!staged.degraded);
        assert_eq!(staged.output.rationale, "readers are busy");
        assert_eq!(
            staged.output.plan,
            "1. LANGUAGE: vietnamese\n2. MAIN TOPIC: hydration"
        );
        assert!(staged.output.raw.contains("<thinking>"));
    }

    #[tokio::test]
    async fn test_backend_failure_uses_fallback_plan() {
        let backend = ScriptedBackend::new("writer")
            .with_failure(BackendError::Unreachable("connection refused".into()));
        let planner = Planner::new(&backend, RetryPolicy::no_retry());
        let request = request(false);

        let staged = planner.plan(&request).await;

        assert!(staged.degraded);
        assert_eq!(
            staged.output.plan,
            WriterPrompts::build_fallback_plan(&request)
        );
    }

    #[tokio::test]
    async fn test_search_disabled_skips_retriever() {
        let backend = ScriptedBackend::new("writer").with_response("plan");
        let retriever = CountingRetriever {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let planner = Planner::new(&backend, RetryPolicy::no_retry()).with_retriever(&retriever);

        let staged = planner.plan(&request(false)).await;

        assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
        assert!(staged.output.context.is_empty());
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_one_shot() {
        let backend = ScriptedBackend::new("writer").with_response("plan");
        let retriever = CountingRetriever {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let planner = Planner::new(&backend, RetryPolicy::no_retry()).with_retriever(&retriever);

        let staged = planner.plan(&request(true)).await;

        assert!(!staged.degraded);
        assert_eq!(retriever.calls.load(Ordering::SeqCst), 1);
        assert!(staged.output.context.is_empty());
    }

    #[tokio::test]
    async fn test_retrieved_context_reaches_prompt() {
        let backend = ScriptedBackend::new("writer").with_response("plan");
        let retriever = CorpusRetriever::from_documents([
            "Drinking water at work keeps concentration high during long meetings.",
        ]);
        let planner = Planner::new(&backend, RetryPolicy::no_retry()).with_retriever(&retriever);

        let staged = planner.plan(&request(true)).await;

        assert_eq!(staged.output.context.len(), 1);
        assert!(backend.prompts()[0].contains("keeps concentration high"));
    }
}
