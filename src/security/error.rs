// Security errors

use thiserror::Error;

/// A parameter that failed the security sweep
///
/// The offending value is carried for the caller's error details but is
/// deliberately left out of the Display text, which ends up in logs.
#[derive(Debug, Clone, Error)]
pub enum SecurityError {
    #[error("Unsafe path in field '{field}': {reason}")]
    UnsafePath {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsafe command in field '{field}': {reason}")]
    UnsafeCommand {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsafe argument in field '{field}': {reason}")]
    UnsafeArgument {
        field: String,
        value: String,
        reason: String,
    },
}

impl SecurityError {
    /// JSON pointer of the offending parameter
    pub fn field(&self) -> &str {
        match self {
            SecurityError::UnsafePath { field, .. }
            | SecurityError::UnsafeCommand { field, .. }
            | SecurityError::UnsafeArgument { field, .. } => field,
        }
    }

    /// The rejected value, for caller-facing details only
    pub fn value(&self) -> &str {
        match self {
            SecurityError::UnsafePath { value, .. }
            | SecurityError::UnsafeCommand { value, .. }
            | SecurityError::UnsafeArgument { value, .. } => value,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            SecurityError::UnsafePath { reason, .. }
            | SecurityError::UnsafeCommand { reason, .. }
            | SecurityError::UnsafeArgument { reason, .. } => reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, SecurityError>;
