// Error types for Executor module
//
// Execution itself never fails with these: a run always yields an
// ExecutionResult. They cover policy construction and configuration.

use thiserror::Error;

/// Executor error types
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("{field} = {value} is outside the allowed range {min}..={max}")]
    PolicyOutOfBounds {
        field: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("Invalid executor configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
