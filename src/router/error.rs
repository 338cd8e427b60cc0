// Handler error types

use crate::protocol::ErrorCode;
use serde_json::Value;
use thiserror::Error;

/// Failures a handler reports back to the router
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// External process ran and failed; `details` carries exit code and output
    #[error("{message}")]
    CommandFailed {
        message: String,
        details: Option<Value>,
    },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            HandlerError::InvalidParameters(_) => ErrorCode::InvalidParameters,
            HandlerError::CommandFailed { .. } => ErrorCode::CommandFailed,
            HandlerError::JobNotFound(_) => ErrorCode::JobNotFound,
            HandlerError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            HandlerError::CommandFailed { details, .. } => details.clone(),
            HandlerError::JobNotFound(id) => Some(serde_json::json!({ "jobId": id })),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        HandlerError::Internal(format!("serialization failed: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, HandlerError>;
