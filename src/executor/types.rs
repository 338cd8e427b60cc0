// Data types for Executor module

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Resource policy for a single execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePolicy {
    /// Working directory; a private scratch directory is used when restricted and unset
    pub working_directory: Option<PathBuf>,
    /// Extra environment variables for the child
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Wall-clock limit in milliseconds
    pub timeout_millis: u64,
    /// Address-space ceiling in MiB
    pub memory_limit_mb: u64,
    /// Scheduling niceness, 0 (normal) to 19 (lowest)
    pub niceness: i32,
    /// Minimal environment, no core dumps, no privilege gain
    pub restricted: bool,
}

impl Default for ResourcePolicy {
    fn default() -> Self {
        Self {
            working_directory: None,
            environment: BTreeMap::new(),
            timeout_millis: 600_000,
            memory_limit_mb: 2048,
            niceness: 10,
            restricted: true,
        }
    }
}

impl ResourcePolicy {
    pub fn with_timeout_millis(mut self, timeout_millis: u64) -> Self {
        self.timeout_millis = timeout_millis;
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_memory_limit_mb(mut self, memory_limit_mb: u64) -> Self {
        self.memory_limit_mb = memory_limit_mb;
        self
    }

    pub fn with_niceness(mut self, niceness: i32) -> Self {
        self.niceness = niceness;
        self
    }

    pub fn restricted(mut self, restricted: bool) -> Self {
        self.restricted = restricted;
        self
    }
}

/// Caller-requested changes to the default policy, checked against configured bounds
#[derive(Debug, Clone, Default)]
pub struct PolicyOverrides {
    pub working_directory: Option<PathBuf>,
    pub environment: BTreeMap<String, String>,
    pub timeout_millis: Option<u64>,
    pub memory_limit_mb: Option<u64>,
    pub niceness: Option<i32>,
}

/// Outcome of one execution
///
/// Always produced, whatever happened; failures are described by
/// `success == false` and `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    /// Process exit code, -1 if killed by a signal or never started
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub elapsed_millis: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub cancelled: bool,
    /// Output exceeded the capture limit
    #[serde(default)]
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

impl ExecutionResult {
    /// Result for a process that never started
    pub fn not_started(error: impl Into<String>, elapsed_millis: u64) -> Self {
        Self {
            success: false,
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            elapsed_millis,
            error: Some(error.into()),
            timed_out: false,
            cancelled: false,
            truncated: false,
            pid: None,
        }
    }
}
