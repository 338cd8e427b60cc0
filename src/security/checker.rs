// Path and command safety predicates

use crate::security::config::{SecurityPolicy, TRAVERSAL_PATTERNS};
use crate::security::error::{Result, SecurityError};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// Why a candidate string was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// `../`, `..\` or a bare `..` component
    Traversal,
    /// Contains a deny-listed substring
    DeniedPattern(String),
    /// Command is empty or whitespace only
    EmptyCommand,
    /// First token of the command is not an allow-listed program
    ProgramNotAllowed(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Traversal => write!(f, "directory traversal"),
            Violation::DeniedPattern(p) => write!(f, "denied pattern {:?}", p),
            Violation::EmptyCommand => write!(f, "empty command"),
            Violation::ProgramNotAllowed(p) => write!(f, "program '{}' is not allowed", p),
        }
    }
}

/// Pure safety predicates over untrusted strings
///
/// Conservative on purpose: rejecting a harmless string is acceptable,
/// accepting a hostile one is not.
#[derive(Debug, Clone)]
pub struct PathSafetyChecker {
    policy: SecurityPolicy,
    /// Deny-list lowered once so matching is case-insensitive
    denied_lower: Vec<String>,
}

impl PathSafetyChecker {
    pub fn new(policy: SecurityPolicy) -> Self {
        let denied_lower = policy
            .denied_patterns
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.to_lowercase())
            .collect();
        Self {
            policy,
            denied_lower,
        }
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Is `candidate` safe to use as a filesystem path or command fragment
    pub fn is_path_safe(&self, candidate: &str) -> bool {
        self.check_path(candidate).is_ok()
    }

    /// Path check plus the program allow-list on the first token
    pub fn is_command_safe(&self, candidate: &str) -> bool {
        self.check_command(candidate).is_ok()
    }

    pub fn check_path(&self, candidate: &str) -> std::result::Result<(), Violation> {
        if TRAVERSAL_PATTERNS.iter().any(|p| candidate.contains(p))
            || candidate.split(['/', '\\']).any(|component| component == "..")
        {
            return Err(Violation::Traversal);
        }

        let lowered = candidate.to_lowercase();
        if let Some(pattern) = self.denied_lower.iter().find(|p| lowered.contains(p.as_str())) {
            return Err(Violation::DeniedPattern(pattern.clone()));
        }

        Ok(())
    }

    pub fn check_command(&self, candidate: &str) -> std::result::Result<(), Violation> {
        self.check_path(candidate)?;

        let program = candidate
            .split_whitespace()
            .next()
            .ok_or(Violation::EmptyCommand)?;

        if self.is_allowed_program(program) {
            Ok(())
        } else {
            Err(Violation::ProgramNotAllowed(program.to_string()))
        }
    }

    /// Exact name, or a path whose last component is the name
    pub fn is_allowed_program(&self, program: &str) -> bool {
        self.policy.allowed_programs.iter().any(|name| {
            program == name
                || program.ends_with(&format!("/{}", name))
                || program.ends_with(&format!("\\{}", name))
        })
    }

    /// Walk a parameter tree and check every path, command and argument field
    ///
    /// Nested objects and arrays are visited; fields are matched by name at
    /// any depth. Non-string values under a watched name are skipped since
    /// schema validation has already fixed their types.
    pub fn check_params(&self, params: &Map<String, Value>) -> Result<()> {
        self.check_object(params, "")
    }

    fn check_object(&self, object: &Map<String, Value>, pointer: &str) -> Result<()> {
        for (key, value) in object {
            let field = format!("{}/{}", pointer, escape_pointer(key));

            if self.policy.path_fields.iter().any(|f| f == key) {
                for (at, s) in strings_in(value, &field) {
                    self.check_path(s).map_err(|v| {
                        debug!(field = %at, value = %s, reason = %v, "unsafe path rejected");
                        SecurityError::UnsafePath {
                            field: at.clone(),
                            value: s.to_string(),
                            reason: v.to_string(),
                        }
                    })?;
                }
            } else if self.policy.command_fields.iter().any(|f| f == key) {
                for (at, s) in strings_in(value, &field) {
                    self.check_command(s).map_err(|v| {
                        debug!(field = %at, value = %s, reason = %v, "unsafe command rejected");
                        SecurityError::UnsafeCommand {
                            field: at.clone(),
                            value: s.to_string(),
                            reason: v.to_string(),
                        }
                    })?;
                }
            } else if self.policy.argument_fields.iter().any(|f| f == key) {
                for (at, s) in strings_in(value, &field) {
                    self.check_path(s).map_err(|v| {
                        debug!(field = %at, value = %s, reason = %v, "unsafe argument rejected");
                        SecurityError::UnsafeArgument {
                            field: at.clone(),
                            value: s.to_string(),
                            reason: v.to_string(),
                        }
                    })?;
                }
            }

            match value {
                Value::Object(inner) => self.check_object(inner, &field)?,
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        if let Value::Object(inner) = item {
                            self.check_object(inner, &format!("{}/{}", field, i))?;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl Default for PathSafetyChecker {
    fn default() -> Self {
        Self::new(SecurityPolicy::default())
    }
}

/// Strings directly under a watched field: the value itself or array elements
fn strings_in<'a>(value: &'a Value, field: &str) -> Vec<(String, &'a str)> {
    match value {
        Value::String(s) => vec![(field.to_string(), s.as_str())],
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| item.as_str().map(|s| (format!("{}/{}", field, i), s)))
            .collect(),
        _ => Vec::new(),
    }
}

/// RFC 6901 escaping for a single pointer token
fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
