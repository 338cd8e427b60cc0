// Request validation: envelope -> schema -> security sweep

use crate::protocol::{ErrorCode, Request};
use crate::schema::{SchemaError, SchemaValidator};
use crate::security::PathSafetyChecker;
use crate::validator::types::{ValidatedRequest, ValidationError, ValidationResult};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

/// Composes the envelope check, schema validation and the security sweep
///
/// Steps run in order and stop at the first failing step: schemas never see
/// a malformed envelope, and the security sweep only sees typed params.
pub struct RequestValidator {
    schemas: SchemaValidator,
    checker: PathSafetyChecker,
}

impl RequestValidator {
    pub fn new(schemas: SchemaValidator, checker: PathSafetyChecker) -> Self {
        Self { schemas, checker }
    }

    pub fn schemas(&self) -> &SchemaValidator {
        &self.schemas
    }

    pub fn schemas_mut(&mut self) -> &mut SchemaValidator {
        &mut self.schemas
    }

    pub fn checker(&self) -> &PathSafetyChecker {
        &self.checker
    }

    /// Validate a decoded JSON envelope
    pub fn validate(&self, envelope: &Value) -> ValidationResult {
        let request = check_envelope(envelope)?;

        let params = self
            .schemas
            .validate(&request.op_type, &request.params)
            .map_err(|e| schema_failure(&request, e))?;

        if let Err(e) = self.checker.check_params(&params) {
            warn!(
                request_id = %request.id,
                op_type = %request.op_type,
                field = %e.field(),
                reason = %e.reason(),
                "security validation failed"
            );
            return Err(ValidationError {
                code: ErrorCode::SecurityValidationFailed,
                message: e.to_string(),
                errors: vec![e.to_string()],
                details: Some(json!({
                    "field": e.field(),
                    "reason": e.reason(),
                    "value": e.value(),
                })),
                id: Some(request.id),
                op_type: Some(request.op_type),
            });
        }

        debug!(request_id = %request.id, op_type = %request.op_type, "request validated");
        Ok(ValidatedRequest::new(Request { params, ..request }))
    }
}

/// Step 1: id/type/params present, correctly typed and non-empty
fn check_envelope(envelope: &Value) -> Result<Request, ValidationError> {
    let Some(object) = envelope.as_object() else {
        return Err(format_error(
            None,
            None,
            vec!["request must be a JSON object".to_string()],
        ));
    };

    let mut errors = Vec::new();

    let id = non_empty_string(object, "id", &mut errors);
    let op_type = non_empty_string(object, "type", &mut errors);
    let params = match object.get("params") {
        Some(Value::Object(p)) => Some(p.clone()),
        Some(_) => {
            errors.push("'params' must be an object".to_string());
            None
        }
        None => {
            errors.push("'params' is required".to_string());
            None
        }
    };

    match (id, op_type, params) {
        (Some(id), Some(op_type), Some(params)) if errors.is_empty() => Ok(Request {
            id,
            op_type,
            params,
        }),
        (id, op_type, _) => Err(format_error(id, op_type, errors)),
    }
}

fn non_empty_string(
    object: &Map<String, Value>,
    key: &str,
    errors: &mut Vec<String>,
) -> Option<String> {
    match object.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            errors.push(format!("'{}' must not be empty", key));
            None
        }
        Some(_) => {
            errors.push(format!("'{}' must be a string", key));
            None
        }
        None => {
            errors.push(format!("'{}' is required", key));
            None
        }
    }
}

fn format_error(
    id: Option<String>,
    op_type: Option<String>,
    errors: Vec<String>,
) -> ValidationError {
    ValidationError {
        code: ErrorCode::InvalidRequestFormat,
        message: format!("Invalid request format: {}", errors.join("; ")),
        details: Some(json!({ "errors": errors })),
        errors,
        id,
        op_type,
    }
}

/// Step 2 failures
fn schema_failure(request: &Request, error: SchemaError) -> ValidationError {
    let id = Some(request.id.clone());
    let op_type = Some(request.op_type.clone());
    match error {
        SchemaError::UnknownType { op_type: t, available } => ValidationError {
            code: ErrorCode::UnknownRequestType,
            message: format!("Unknown request type: {}", t),
            errors: vec![format!("no schema registered for '{}'", t)],
            details: Some(json!({ "availableTypes": available })),
            id,
            op_type,
        },
        SchemaError::Invalid { errors, .. } => ValidationError {
            code: ErrorCode::InvalidParameters,
            message: format!(
                "Invalid parameters: {}",
                errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
            ),
            errors: errors.iter().map(|e| e.to_string()).collect(),
            details: Some(json!({ "fieldErrors": errors })),
            id,
            op_type,
        },
        SchemaError::Compile { message, .. } => ValidationError {
            code: ErrorCode::InternalError,
            message: format!("Schema unavailable: {}", message),
            errors: vec![message],
            details: None,
            id,
            op_type,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaConfig;

    fn validator() -> RequestValidator {
        let mut schemas = SchemaValidator::new(SchemaConfig::default());
        schemas
            .register_schema(
                "noop.echo",
                json!({
                    "type": "object",
                    "properties": {
                        "path": {"type": "string"},
                        "count": {"type": "integer", "minimum": 0}
                    },
                    "additionalProperties": false
                }),
            )
            .unwrap();
        RequestValidator::new(schemas, PathSafetyChecker::default())
    }

    #[test]
    fn test_valid_request() {
        let v = validator();
        let req = v
            .validate(&json!({"id": "1", "type": "noop.echo", "params": {"path": "a/b.txt"}}))
            .unwrap();
        assert_eq!(req.id(), "1");
        assert_eq!(req.op_type(), "noop.echo");
        assert_eq!(req.params()["path"], "a/b.txt");
    }

    #[test]
    fn test_envelope_errors_are_collected() {
        let v = validator();
        let err = v.validate(&json!({"id": "", "type": 3})).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequestFormat);
        assert_eq!(err.errors.len(), 3);
        assert!(err.id.is_none());
    }

    #[test]
    fn test_envelope_keeps_recoverable_id() {
        let v = validator();
        let err = v.validate(&json!({"id": "9", "type": "noop.echo"})).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequestFormat);
        assert_eq!(err.id.as_deref(), Some("9"));
        assert_eq!(err.to_response().id.as_deref(), Some("9"));
    }

    #[test]
    fn test_non_object_envelope() {
        let v = validator();
        let err = v.validate(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequestFormat);
    }

    #[test]
    fn test_unknown_type() {
        let v = validator();
        let err = v
            .validate(&json!({"id": "5", "type": "does.not.exist", "params": {}}))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownRequestType);
        let types = err.details.unwrap()["availableTypes"].clone();
        assert_eq!(types, json!(["noop.echo"]));
    }

    #[test]
    fn test_schema_runs_before_security() {
        let v = validator();
        // path has the wrong type, so the unsafe count never reaches the sweep
        let err = v
            .validate(&json!({"id": "1", "type": "noop.echo", "params": {"path": 5, "count": -1}}))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameters);
        assert_eq!(err.errors.len(), 2);
    }

    #[test]
    fn test_security_failure() {
        let v = validator();
        let err = v
            .validate(&json!({
                "id": "2",
                "type": "noop.echo",
                "params": {"path": "../../etc/passwd"}
            }))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SecurityValidationFailed);
        assert_eq!(err.details.as_ref().unwrap()["field"], "/path");
        assert!(!err.message.contains("passwd"));
    }

    #[test]
    fn test_coerced_params_are_returned() {
        let v = validator();
        let req = v
            .validate(&json!({"id": "1", "type": "noop.echo", "params": {"count": "4"}}))
            .unwrap();
        assert_eq!(req.params()["count"], json!(4));
    }
}
