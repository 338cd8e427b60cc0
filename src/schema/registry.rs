// Schema registry and validation

use crate::schema::coerce::coerce_numeric_strings;
use crate::schema::config::SchemaConfig;
use crate::schema::error::{FieldError, Result, SchemaError};
use jsonschema::{Draft, Validator};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A compiled schema kept next to its source document
struct CompiledSchema {
    raw: Value,
    validator: Validator,
}

/// Per-operation parameter schemas
///
/// Populated at startup. Validation only reads, so a built registry can be
/// shared across tasks without locking.
pub struct SchemaValidator {
    config: SchemaConfig,
    schemas: HashMap<String, CompiledSchema>,
}

impl SchemaValidator {
    pub fn new(config: SchemaConfig) -> Self {
        Self {
            config,
            schemas: HashMap::new(),
        }
    }

    /// Compile and register the schema for an operation type
    ///
    /// Registering a type twice replaces the earlier schema.
    pub fn register_schema(&mut self, op_type: &str, schema: Value) -> Result<()> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&schema)
            .map_err(|e| SchemaError::Compile {
                op_type: op_type.to_string(),
                message: e.to_string(),
            })?;

        let previous = self.schemas.insert(
            op_type.to_string(),
            CompiledSchema {
                raw: schema,
                validator,
            },
        );
        if previous.is_some() {
            warn!(op_type = %op_type, "schema re-registered, previous schema replaced");
        } else {
            debug!(op_type = %op_type, "schema registered");
        }
        Ok(())
    }

    /// Validate params for `op_type`, returning the params after coercion
    pub fn validate(&self, op_type: &str, params: &Map<String, Value>) -> Result<Map<String, Value>> {
        let compiled = self
            .schemas
            .get(op_type)
            .ok_or_else(|| SchemaError::UnknownType {
                op_type: op_type.to_string(),
                available: self.known_types(),
            })?;

        let mut instance = Value::Object(params.clone());
        if self.config.coerce_numeric_strings {
            coerce_numeric_strings(&compiled.raw, &mut instance);
        }

        let errors: Vec<FieldError> = compiled
            .validator
            .iter_errors(&instance)
            .map(|e| {
                let path = e.instance_path.to_string();
                FieldError {
                    path: if path.is_empty() { "/".to_string() } else { path },
                    message: e.to_string(),
                }
            })
            .collect();

        if !errors.is_empty() {
            return Err(SchemaError::Invalid {
                op_type: op_type.to_string(),
                errors,
            });
        }

        match instance {
            Value::Object(map) => Ok(map),
            _ => Err(SchemaError::Invalid {
                op_type: op_type.to_string(),
                errors: vec![FieldError {
                    path: "/".to_string(),
                    message: "params must be an object".to_string(),
                }],
            }),
        }
    }

    /// Registered operation types, sorted
    pub fn known_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.schemas.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn schema(&self, op_type: &str) -> Option<&Value> {
        self.schemas.get(op_type).map(|c| &c.raw)
    }

    pub fn contains(&self, op_type: &str) -> bool {
        self.schemas.contains_key(op_type)
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new(SchemaConfig::default())
    }
}
