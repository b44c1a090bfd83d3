pub mod prompt;
pub mod analyze;

pub use prompt::*;
pub use analyze::*;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No API credential available")]
    MissingCredential,

    #[error("File is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Generation service error: {0}")]
    Service(#[from] LlmError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
