use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Wire error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Line was not valid JSON
    ParseError,
    /// Envelope is missing id/type/params or has the wrong shape
    InvalidRequestFormat,
    /// No schema or handler registered for the type
    UnknownRequestType,
    /// Params failed schema validation
    InvalidParameters,
    /// A path or command field failed the safety checks
    SecurityValidationFailed,
    /// External process ran but failed, timed out or could not be spawned
    CommandFailed,
    /// Job id never existed or was already reaped
    JobNotFound,
    /// Anything unexpected inside a handler
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::InvalidRequestFormat => "INVALID_REQUEST_FORMAT",
            ErrorCode::UnknownRequestType => "UNKNOWN_REQUEST_TYPE",
            ErrorCode::InvalidParameters => "INVALID_PARAMETERS",
            ErrorCode::SecurityValidationFailed => "SECURITY_VALIDATION_FAILED",
            ErrorCode::CommandFailed => "COMMAND_FAILED",
            ErrorCode::JobNotFound => "JOB_NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound request after the envelope check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    #[serde(rename = "type")]
    pub op_type: String,
    pub params: Map<String, Value>,
}

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Error payload of an error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Outbound response envelope
///
/// `id` and `type` are null only when the request could not be parsed far
/// enough to recover them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub op_type: Option<String>,
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn success(id: impl Into<String>, op_type: impl Into<String>, result: Value) -> Self {
        Self {
            id: Some(id.into()),
            op_type: Some(op_type.into()),
            status: ResponseStatus::Success,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(
        id: Option<String>,
        op_type: Option<String>,
        code: ErrorCode,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        Self {
            id,
            op_type,
            status: ResponseStatus::Error,
            result: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
                details,
            }),
        }
    }

    /// Response for a line that was not JSON at all
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::error(None, None, ErrorCode::ParseError, message, None)
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}
