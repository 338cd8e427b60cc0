// Schema errors

use serde::Serialize;
use thiserror::Error;

/// A single failed constraint, addressed by JSON pointer into params
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Schema registry errors
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Unknown request type: {op_type}")]
    UnknownType {
        op_type: String,
        available: Vec<String>,
    },

    #[error("Invalid parameters for '{op_type}': {} error(s)", errors.len())]
    Invalid {
        op_type: String,
        errors: Vec<FieldError>,
    },

    #[error("Failed to compile schema for '{op_type}': {message}")]
    Compile { op_type: String, message: String },
}

pub type Result<T> = std::result::Result<T, SchemaError>;
