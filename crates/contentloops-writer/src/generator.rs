use contentloops_llm::tags::{extract_tag, extract_thinking, strip_tag};
use contentloops_llm::{complete_with_retry, LlmBackend, RetryPolicy, Staged};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::{GenerationOutput, PlanOutput, RunRequest, WriterPrompts};

/// Content used when the backend produced nothing usable. Short enough to fail the length gate.
pub const FALLBACK_CONTENT: &str = "Content could not be generated for this request.";

/// Snippets passed to the generation prompt
pub const MAX_CONTEXT_SNIPPETS: usize = 5;

/// Characters kept per snippet
pub const MAX_SNIPPET_CHARS: usize = 300;

lazy_static! {
    static ref CONTENT_END: Regex = Regex::new(r"(?i)\**CONTENT_END\**").unwrap();
    static ref CHAIN_OF_THOUGHT_LINE: Regex = Regex::new(r"(?m)^.*CHAIN OF THOUGHT.*$").unwrap();
    static ref LABEL_PREFIX: Regex =
        Regex::new(r"(?im)^[ \t]*(?:post content|content as follows|content|article)[ \t]*:[ \t]*")
            .unwrap();
    static ref RULE_LINE: Regex = Regex::new(r"(?m)^[ \t]*-{3,}[ \t]*$").unwrap();
    static ref BLANK_RUN: Regex = Regex::new(r"\n(?:[ \t]*\n){2,}").unwrap();
}

/// Generate stage: one draft per iteration
pub struct Generator<'a> {
    backend: &'a dyn LlmBackend,
    retry: RetryPolicy,
}

impl<'a> Generator<'a> {
    pub fn new(backend: &'a dyn LlmBackend, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Draft a post from the plan and the previous iteration's feedback.
    ///
    /// Never fails. When the backend is unavailable the output carries
    /// [`FALLBACK_CONTENT`] and is marked degraded.
    pub async fn generate(
        &self,
        request: &RunRequest,
        plan: &PlanOutput,
        feedback: &str,
    ) -> Staged<GenerationOutput> {
        let context = bound_context(&plan.context);
        let prompt = WriterPrompts::build_generation_prompt(request, plan, feedback, &context);

        debug!(prompt_len = prompt.len(), has_feedback = !feedback.is_empty(), "Running generator");
        let completion = complete_with_retry(self.backend, &prompt, &self.retry).await;

        if completion.degraded {
            warn!("Generator backend unavailable, using fallback content");
            return Staged::fallback(GenerationOutput {
                content: FALLBACK_CONTENT.to_string(),
                rationale: String::new(),
                raw: completion.text,
            });
        }

        let raw = completion.text;
        let rationale = extract_thinking(&raw);
        let content = extract_content(&raw);

        if content.is_empty() {
            warn!("Generator response had no content, using fallback content");
            return Staged::fallback(GenerationOutput {
                content: FALLBACK_CONTENT.to_string(),
                rationale,
                raw,
            });
        }

        Staged::completed(GenerationOutput {
            content,
            rationale,
            raw,
        })
    }
}

/// Pull the post out of a raw response.
///
/// A `<content>` block wins. Otherwise reasoning blocks, end markers,
/// label prefixes and horizontal rules are removed from the whole text.
pub fn extract_content(raw: &str) -> String {
    if let Some(block) = extract_tag(raw, "content") {
        return collapse_blank_lines(&CONTENT_END.replace_all(block, ""));
    }

    let text = strip_tag(&strip_tag(raw, "thinking"), "think");
    let text = CHAIN_OF_THOUGHT_LINE.replace_all(&text, "");
    let text = CONTENT_END.replace_all(&text, "");
    let text = LABEL_PREFIX.replace_all(&text, "");
    let text = RULE_LINE.replace_all(&text, "");
    collapse_blank_lines(&text)
}

fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN.replace_all(text, "\n\n").trim().to_string()
}

fn bound_context(context: &[String]) -> Vec<String> {
    context
        .iter()
        .take(MAX_CONTEXT_SNIPPETS)
        .map(|snippet| {
            if snippet.chars().count() > MAX_SNIPPET_CHARS {
                let cut: String = snippet.chars().take(MAX_SNIPPET_CHARS).collect();
                format!("{}...", cut)
            } else {
                snippet.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentloops_llm::{BackendError, ScriptedBackend};

    fn request() -> RunRequest {
        RunRequest::builder("Post about vitamin C").build().unwrap()
    }

    #[test]
    fn test_extract_content_prefers_content_block() {
        let raw = "<thinking>draft a hook</thinking>\n<content>\nOranges are great.\n\n\n\nEat one daily.\n</content>\nCONTENT_END";
        assert_eq!(extract_content(raw), "Oranges are great.\n\nEat one daily.");
    }

    #[test]
    fn test_extract_content_cleans_untagged_response() {
        let raw = "🧠 CHAIN OF THOUGHT - WRITER:\n<think>hmm</think>\nPost content: Drink water.\n---\nStay hydrated.\n**CONTENT_END**";
        assert_eq!(extract_content(raw), "Drink water.\n\nStay hydrated.");
    }

    #[test]
    fn test_bound_context_limits_count_and_length() {
        let long = "x".repeat(MAX_SNIPPET_CHARS + 50);
        let context: Vec<String> = (0..8).map(|_| long.clone()).collect();

        let bounded = bound_context(&context);

        assert_eq!(bounded.len(), MAX_CONTEXT_SNIPPETS);
        assert_eq!(bounded[0].chars().count(), MAX_SNIPPET_CHARS + 3);
        assert!(bounded[0].ends_with("..."));
    }

    #[test]
    fn test_fallback_content_fails_length_gate() {
        assert!(FALLBACK_CONTENT.trim().chars().count() < 100);
    }

    #[tokio::test]
    async fn test_generate_returns_extracted_content() {
        let backend = ScriptedBackend::new("writer").with_response(
            "<thinking>lead with a statistic</thinking><content>Vitamin C supports immunity.</content>",
        );
        let generator = Generator::new(&backend, RetryPolicy::no_retry());

        let staged = generator
            .generate(&request(), &PlanOutput::default(), "")
            .await;

        assert!(!staged.degraded);
        assert_eq!(staged.output.content, "Vitamin C supports immunity.");
        assert_eq!(staged.output.rationale, "lead with a statistic");
    }

    #[tokio::test]
    async fn test_generate_passes_feedback_to_prompt() {
        let backend = ScriptedBackend::new("writer").with_response("<content>Draft two</content>");
        let generator = Generator::new(&backend, RetryPolicy::no_retry());

        generator
            .generate(&request(), &PlanOutput::default(), "Cite a source")
            .await;

        assert!(backend.prompts()[0].contains("Cite a source"));
    }

    #[tokio::test]
    async fn test_generate_backend_failure_uses_fallback() {
        let backend = ScriptedBackend::new("writer")
            .with_failure(BackendError::Timeout(std::time::Duration::from_secs(60)));
        let generator = Generator::new(&backend, RetryPolicy::no_retry());

        let staged = generator
            .generate(&request(), &PlanOutput::default(), "")
            .await;

        assert!(staged.degraded);
        assert_eq!(staged.output.content, FALLBACK_CONTENT);
    }
}
