use thiserror::Error;

/// Line codec errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Failed to decode request: {0}")]
    DecodeError(String),

    #[error("Failed to encode response: {0}")]
    EncodeError(String),

    #[error("Request line too long: {0} bytes")]
    LineTooLong(usize),
}
