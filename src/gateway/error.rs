// Gateway error types

use crate::schema::SchemaError;
use thiserror::Error;

/// Errors raised while assembling a gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Schema registration failed: {0}")]
    Schema(#[from] SchemaError),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
