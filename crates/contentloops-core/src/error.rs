use contentloops_writer::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Invalid run request: {0}")]
    Validation(#[from] ValidationError),
}
