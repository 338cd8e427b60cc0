// Request dispatch with a failure boundary

use crate::protocol::{ErrorCode, Response};
use crate::router::handler::{FnHandler, Handler};
use crate::router::error::Result;
use crate::security::{SecurityPolicy, redact_params};
use crate::validator::ValidatedRequest;
use futures::FutureExt;
use serde_json::{Map, Value, json};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Maps operation types to handlers
///
/// Registration happens before the router is shared; `route` only reads.
pub struct Router {
    handlers: HashMap<String, Arc<dyn Handler>>,
    redaction: SecurityPolicy,
}

impl Router {
    /// `redaction` decides which parameter values are hidden in log summaries
    pub fn new(redaction: SecurityPolicy) -> Self {
        Self {
            handlers: HashMap::new(),
            redaction,
        }
    }

    pub fn register(&mut self, op_type: &str, handler: Arc<dyn Handler>) {
        if self.handlers.insert(op_type.to_string(), handler).is_some() {
            warn!(op_type = %op_type, "handler re-registered, previous handler replaced");
        } else {
            debug!(op_type = %op_type, "handler registered");
        }
    }

    /// Register a closure over the raw parameter map
    pub fn register_fn<F, Fut>(&mut self, op_type: &str, f: F)
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.register(op_type, Arc::new(FnHandler::new(f)));
    }

    pub fn contains(&self, op_type: &str) -> bool {
        self.handlers.contains_key(op_type)
    }

    /// Registered operation types, sorted
    pub fn available_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    /// Dispatch a validated request and build its single response
    ///
    /// Handler errors map to their codes. A panicking handler becomes
    /// INTERNAL_ERROR; the panic never reaches the caller.
    pub async fn route(&self, request: ValidatedRequest) -> Response {
        let request = request.into_request();
        let (id, op_type) = (request.id, request.op_type);

        let Some(handler) = self.handlers.get(&op_type).cloned() else {
            warn!(request_id = %id, op_type = %op_type, "no handler registered");
            return Response::error(
                Some(id),
                Some(op_type.clone()),
                ErrorCode::UnknownRequestType,
                format!("Unknown request type: {}", op_type),
                Some(json!({ "availableTypes": self.available_types() })),
            );
        };

        let summary = redact_params(&request.params, &self.redaction);
        info!(request_id = %id, op_type = %op_type, params = %summary, "dispatching request");

        let start = Instant::now();
        let outcome = AssertUnwindSafe(handler.run(request.params))
            .catch_unwind()
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(result)) => {
                info!(request_id = %id, op_type = %op_type, elapsed_ms = elapsed_ms, "request succeeded");
                Response::success(id, op_type, result)
            }
            Ok(Err(e)) => {
                warn!(
                    request_id = %id,
                    op_type = %op_type,
                    code = %e.code(),
                    elapsed_ms = elapsed_ms,
                    error = %e,
                    "request failed"
                );
                Response::error(Some(id), Some(op_type), e.code(), e.to_string(), e.details())
            }
            Err(panic) => {
                error!(
                    request_id = %id,
                    op_type = %op_type,
                    params = %summary,
                    panic = %panic_message(panic.as_ref()),
                    "handler panicked"
                );
                Response::error(
                    Some(id),
                    Some(op_type),
                    ErrorCode::InternalError,
                    "Internal error while handling request",
                    None,
                )
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(SecurityPolicy::default())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Request;
    use crate::router::HandlerError;

    fn request(id: &str, op_type: &str, params: Value) -> ValidatedRequest {
        ValidatedRequest::new(Request {
            id: id.to_string(),
            op_type: op_type.to_string(),
            params: params.as_object().cloned().unwrap_or_default(),
        })
    }

    fn router() -> Router {
        let mut router = Router::default();
        router.register_fn("noop.echo", |params| async move { Ok(json!({ "echo": params })) });
        router.register_fn("always.fails", |_| async move {
            Err(HandlerError::CommandFailed {
                message: "exit 3".to_string(),
                details: Some(json!({ "exitCode": 3 })),
            })
        });
        router.register_fn("always.panics", |_| async move {
            if true {
                panic!("handler blew up");
            }
            Ok(Value::Null)
        });
        router
    }

    #[tokio::test]
    async fn test_route_success() {
        let response = router()
            .route(request("1", "noop.echo", json!({"path": "a/b.txt"})))
            .await;
        assert!(response.is_success());
        assert_eq!(response.id.as_deref(), Some("1"));
        assert_eq!(response.result.unwrap()["echo"]["path"], "a/b.txt");
    }

    #[tokio::test]
    async fn test_route_unknown_lists_types() {
        let response = router().route(request("5", "does.not.exist", json!({}))).await;
        assert_eq!(response.error_code(), Some(ErrorCode::UnknownRequestType));
        let types = response.error.unwrap().details.unwrap()["availableTypes"].clone();
        assert_eq!(types, json!(["always.fails", "always.panics", "noop.echo"]));
    }

    #[tokio::test]
    async fn test_handler_error_keeps_code_and_details() {
        let response = router().route(request("2", "always.fails", json!({}))).await;
        let error = response.error.unwrap();
        assert_eq!(error.code, ErrorCode::CommandFailed);
        assert_eq!(error.details.unwrap()["exitCode"], 3);
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let response = router().route(request("3", "always.panics", json!({}))).await;
        assert_eq!(response.id.as_deref(), Some("3"));
        assert_eq!(response.error_code(), Some(ErrorCode::InternalError));
        assert!(!response.error.unwrap().message.contains("blew up"));
    }
}
