// Schema module - per-operation parameter schemas
// Compiled once at registration, read-only afterwards.

pub mod coerce;
pub mod config;
pub mod error;
pub mod registry;

pub use config::SchemaConfig;
pub use error::{FieldError, Result, SchemaError};
pub use registry::SchemaValidator;
