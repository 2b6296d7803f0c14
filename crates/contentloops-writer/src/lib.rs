mod generator;
mod output;
mod planner;
mod prompts;
mod request;

pub use generator::{Generator, FALLBACK_CONTENT, MAX_CONTEXT_SNIPPETS, MAX_SNIPPET_CHARS};
pub use output::{GenerationOutput, PlanOutput};
pub use planner::{Planner, DEFAULT_TOP_K};
pub use prompts::WriterPrompts;
pub use request::{Language, PostType, RunRequest, RunRequestBuilder, Topic, ValidationError};
