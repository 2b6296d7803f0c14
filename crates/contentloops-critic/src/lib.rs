mod criteria;
pub mod evaluator;
mod prompts;
mod verdict;

pub use criteria::{CriteriaWeights, DEFAULT_CRITERIA};
pub use evaluator::{
    EvaluationOutput, Evaluator, FAIL_SOFT_SCORE, MIN_CONTENT_CHARS, TOO_SHORT_FEEDBACK,
};
pub use prompts::CriticPrompts;
pub use verdict::{Verdict, VerdictParseError, VerdictSource, NO_FEEDBACK, PARSE_FAILURE_FEEDBACK};
