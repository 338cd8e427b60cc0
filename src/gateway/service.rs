// Gateway: validator + router behind one entry point

use crate::config::GatewayConfig;
use crate::gateway::error::Result;
use crate::operations::{self, OperationContext};
use crate::protocol::{ErrorCode, ProtocolError, Response, decode_line};
use crate::router::{Handler, Router};
use crate::schema::SchemaValidator;
use crate::security::PathSafetyChecker;
use crate::validator::RequestValidator;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Registered operation types and their raw schemas, sorted by type
pub type Catalogue = Arc<RwLock<BTreeMap<String, Value>>>;

/// Validates and dispatches requests
///
/// Built and populated at startup, then shared behind an `Arc`. Every call to
/// `handle_value` produces exactly one response.
pub struct Gateway {
    validator: RequestValidator,
    router: Router,
    catalogue: Catalogue,
    max_line_bytes: usize,
}

impl Gateway {
    pub fn new(validator: RequestValidator, router: Router, max_line_bytes: usize) -> Self {
        Self {
            validator,
            router,
            catalogue: Arc::new(RwLock::new(BTreeMap::new())),
            max_line_bytes,
        }
    }

    /// Empty gateway wired from configuration, no operations registered
    pub fn from_config(config: &GatewayConfig) -> Self {
        let validator = RequestValidator::new(
            SchemaValidator::new(config.schema.clone()),
            PathSafetyChecker::new(config.security.clone()),
        );
        let router = Router::new(config.security.clone());
        Self::new(validator, router, config.comm.max_line_bytes)
    }

    /// Gateway with every built-in operation registered
    pub fn with_builtin(config: &GatewayConfig, ctx: OperationContext) -> Result<Self> {
        let mut gateway = Self::from_config(config);
        operations::register_builtin(&mut gateway, ctx)?;
        Ok(gateway)
    }

    /// Register the schema and handler of one operation
    ///
    /// Both sides always change together, so a type is never routable
    /// without a schema or validated without a handler.
    pub fn register(&mut self, op_type: &str, schema: Value, handler: Arc<dyn Handler>) -> Result<()> {
        self.validator
            .schemas_mut()
            .register_schema(op_type, schema.clone())?;
        self.router.register(op_type, handler);
        self.catalogue
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op_type.to_string(), schema);
        Ok(())
    }

    pub fn catalogue(&self) -> Catalogue {
        Arc::clone(&self.catalogue)
    }

    pub fn operation_count(&self) -> usize {
        self.catalogue
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn available_types(&self) -> Vec<String> {
        self.router.available_types()
    }

    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    /// Handle one raw line; blank lines produce no response
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        if line.trim().is_empty() {
            return None;
        }

        let response = match decode_line(line, self.max_line_bytes) {
            Ok(value) => self.handle_value(value).await,
            Err(ProtocolError::LineTooLong(len)) => Self::oversized(len, self.max_line_bytes),
            Err(e) => {
                debug!(error = %e, "request line is not JSON");
                Response::parse_error(format!("Parse error: {}", e))
            }
        };
        Some(response)
    }

    /// Validate then route a decoded request
    pub async fn handle_value(&self, value: Value) -> Response {
        match self.validator.validate(&value) {
            Ok(request) => self.router.route(request).await,
            Err(e) => {
                debug!(code = %e.code, errors = ?e.errors, "request rejected");
                e.to_response()
            }
        }
    }

    /// Response for a line longer than the transport accepts
    pub fn oversized(len: usize, max_line_bytes: usize) -> Response {
        warn!(len = len, max_line_bytes = max_line_bytes, "request line too long");
        Response::error(
            None,
            None,
            ErrorCode::InvalidRequestFormat,
            format!("Request line exceeds {} bytes", max_line_bytes),
            Some(json!({ "maxLineBytes": max_line_bytes })),
        )
    }
}
