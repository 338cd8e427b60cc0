use crate::protocol::{ErrorCode, Request, Response};
use serde_json::{Map, Value};

/// A request that passed every validation step
///
/// Only `RequestValidator` constructs these, so holding one proves the
/// envelope, schema and security checks ran.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    request: Request,
}

impl ValidatedRequest {
    pub(crate) fn new(request: Request) -> Self {
        Self { request }
    }

    pub fn id(&self) -> &str {
        &self.request.id
    }

    pub fn op_type(&self) -> &str {
        &self.request.op_type
    }

    /// Params after schema coercion
    pub fn params(&self) -> &Map<String, Value> {
        &self.request.params
    }

    pub fn into_request(self) -> Request {
        self.request
    }
}

/// Why a request was rejected
///
/// `errors` is ordered as discovered; `details` is the caller-facing
/// structured payload.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: ErrorCode,
    pub message: String,
    pub errors: Vec<String>,
    pub details: Option<Value>,
    /// Request id, when the envelope carried a usable one
    pub id: Option<String>,
    /// Operation type, when the envelope carried a usable one
    pub op_type: Option<String>,
}

impl ValidationError {
    pub fn to_response(&self) -> Response {
        Response::error(
            self.id.clone(),
            self.op_type.clone(),
            self.code,
            self.message.clone(),
            self.details.clone(),
        )
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// `Ok` is a valid request, `Err` carries the error code and details
pub type ValidationResult = std::result::Result<ValidatedRequest, ValidationError>;
