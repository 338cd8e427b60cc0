// Parameter schemas for the built-in operations (JSON Schema 2020-12)
//
// Every schema is closed: unknown parameters are rejected before a handler
// runs. Resource bounds come from the executor configuration.

use crate::executor::ExecutorConfig;
use crate::executor::config::{MAX_NICENESS, MIN_MEMORY_LIMIT_MB, MIN_NICENESS};
use serde_json::{Value, json};

fn empty() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "additionalProperties": false
    })
}

pub fn noop_echo() -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": { "type": "string" },
            "message": { "type": "string" }
        },
        "additionalProperties": false
    })
}

pub fn command_run(config: &ExecutorConfig) -> Value {
    json!({
        "type": "object",
        "properties": {
            "command": { "type": "string", "minLength": 1 },
            "args": { "type": "array", "items": { "type": "string" } },
            "workingDirectory": { "type": "string", "minLength": 1 },
            "timeoutMillis": { "type": "integer", "minimum": 1, "maximum": config.max_timeout_ms },
            "memoryLimitMB": {
                "type": "integer",
                "minimum": MIN_MEMORY_LIMIT_MB,
                "maximum": config.max_memory_limit_mb
            },
            "niceness": { "type": "integer", "minimum": MIN_NICENESS, "maximum": MAX_NICENESS },
            "environment": {
                "type": "object",
                "additionalProperties": { "type": "string" }
            },
            "background": { "type": "boolean" }
        },
        "required": ["command"],
        "additionalProperties": false
    })
}

pub fn simulation_run(config: &ExecutorConfig) -> Value {
    json!({
        "type": "object",
        "properties": {
            "workflowPath": { "type": "string", "minLength": 1 },
            "measuresOnly": { "type": "boolean" },
            "timeoutMillis": { "type": "integer", "minimum": 1, "maximum": config.max_timeout_ms },
            "memoryLimitMB": {
                "type": "integer",
                "minimum": MIN_MEMORY_LIMIT_MB,
                "maximum": config.max_memory_limit_mb
            }
        },
        "required": ["workflowPath"],
        "additionalProperties": false
    })
}

pub fn job_status() -> Value {
    json!({
        "type": "object",
        "properties": {
            "jobId": { "type": "string", "minLength": 1 },
            "consume": { "type": "boolean" }
        },
        "required": ["jobId"],
        "additionalProperties": false
    })
}

pub fn job_id() -> Value {
    json!({
        "type": "object",
        "properties": {
            "jobId": { "type": "string", "minLength": 1 }
        },
        "required": ["jobId"],
        "additionalProperties": false
    })
}

pub fn job_list() -> Value {
    empty()
}

pub fn gateway_operations() -> Value {
    empty()
}
