//! Error types for exercise operations
//!
//! Every error is local and recoverable: an exercise that rejects an operation is left
//! exactly as it was before the call.

use thiserror::Error;

use crate::types::{ExerciseCommand, ExerciseStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExerciseError {
    /// The source contained no non-blank lines.
    #[error("source code contains no usable lines")]
    EmptySource,
    #[error("time limit must be at least one second")]
    InvalidTimeLimit,
    #[error("cannot {operation} while exercise is {status}")]
    InvalidTransition {
        operation: ExerciseCommand,
        status: ExerciseStatus,
    },
    #[error("unknown fragment id: {id}")]
    UnknownFragment { id: String },
}

impl ExerciseError {
    /// Stable machine-readable code for protocol error messages
    pub fn code(&self) -> &'static str {
        match self {
            ExerciseError::EmptySource => "empty_source",
            ExerciseError::InvalidTimeLimit => "invalid_time_limit",
            ExerciseError::InvalidTransition { .. } => "invalid_transition",
            ExerciseError::UnknownFragment { .. } => "unknown_fragment",
        }
    }
}

pub type Result<T> = std::result::Result<T, ExerciseError>;
