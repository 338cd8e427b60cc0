// Validator module - envelope, schema and security checks in one pass

pub mod request;
pub mod types;

pub use request::RequestValidator;
pub use types::{ValidatedRequest, ValidationError, ValidationResult};
