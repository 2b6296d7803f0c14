mod controller;
mod error;
mod outcome;
mod state;

pub use controller::RefinementController;
pub use error::RunError;
pub use outcome::{RunOutcome, RunStatus};
pub use state::{BestResult, IterationState, ThinkingLogEntry};
