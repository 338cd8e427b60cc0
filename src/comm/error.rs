use thiserror::Error;

/// Comm module initialization errors
#[derive(Debug, Error)]
pub enum CommInitError {
    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Failed to bind TCP listener: {0}")]
    BindFailed(String),
}

/// Comm module runtime errors
#[derive(Debug, Error)]
pub enum CommError {
    #[error("Failed to read request: {0}")]
    ReadError(String),

    #[error("Failed to write response: {0}")]
    WriteError(String),

    #[error("Failed to encode response: {0}")]
    EncodeError(String),

    #[error("Connection limit closed")]
    LimitClosed,
}

/// Result type for comm operations
pub type Result<T> = std::result::Result<T, CommError>;
