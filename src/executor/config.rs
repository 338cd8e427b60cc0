// Executor configuration

use crate::executor::error::{ExecutorError, Result};
use crate::executor::types::{PolicyOverrides, ResourcePolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lowest niceness a caller may request
pub const MIN_NICENESS: i32 = 0;
/// Highest niceness a caller may request
pub const MAX_NICENESS: i32 = 19;
/// Smallest memory ceiling a caller may request, in MiB
pub const MIN_MEMORY_LIMIT_MB: u64 = 16;

/// Executor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Timeout applied when a request does not ask for one
    pub default_timeout_ms: u64,
    /// Largest timeout a request may ask for
    pub max_timeout_ms: u64,
    pub default_memory_limit_mb: u64,
    pub max_memory_limit_mb: u64,
    pub default_niceness: i32,
    /// Run every child in restricted mode; requests cannot turn this off
    pub restricted: bool,
    /// Capture limit per stream (stdout, stderr)
    pub max_output_bytes: usize,
    /// Time between SIGTERM and SIGKILL when terminating a process group
    pub kill_grace_ms: u64,
    /// Put restricted children in fresh user+network namespaces (Linux)
    pub isolate_network: bool,
    /// RLIMIT_NOFILE for restricted children
    pub max_open_files: u64,
    /// External tool started by simulation.run
    pub simulator_program: String,
    /// Restricted children may only be given working directories under this root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_root: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 600_000,
            max_timeout_ms: 86_400_000,
            default_memory_limit_mb: 2048,
            max_memory_limit_mb: 16_384,
            default_niceness: 10,
            restricted: true,
            max_output_bytes: 1_048_576, // 1MB
            kill_grace_ms: 2000,
            isolate_network: false,
            max_open_files: 1024,
            simulator_program: "openstudio".to_string(),
            working_root: None,
        }
    }
}

impl ExecutorConfig {
    /// Policy used when a request overrides nothing
    pub fn default_policy(&self) -> ResourcePolicy {
        ResourcePolicy {
            working_directory: None,
            environment: Default::default(),
            timeout_millis: self.default_timeout_ms,
            memory_limit_mb: self.default_memory_limit_mb,
            niceness: self.default_niceness,
            restricted: self.restricted,
        }
    }

    /// Apply caller overrides, rejecting anything outside the configured bounds
    pub fn bounded_policy(&self, overrides: PolicyOverrides) -> Result<ResourcePolicy> {
        let mut policy = self.default_policy();

        if let Some(timeout) = overrides.timeout_millis {
            check_range("timeoutMillis", timeout, 1, self.max_timeout_ms)?;
            policy.timeout_millis = timeout;
        }
        if let Some(memory) = overrides.memory_limit_mb {
            check_range("memoryLimitMB", memory, MIN_MEMORY_LIMIT_MB, self.max_memory_limit_mb)?;
            policy.memory_limit_mb = memory;
        }
        if let Some(niceness) = overrides.niceness {
            check_range(
                "niceness",
                i64::from(niceness),
                i64::from(MIN_NICENESS),
                i64::from(MAX_NICENESS),
            )?;
            policy.niceness = niceness;
        }
        policy.working_directory = overrides.working_directory;
        policy.environment = overrides.environment;

        Ok(policy)
    }

    /// Reject configurations that could never produce a usable policy
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_ms == 0 || self.default_timeout_ms > self.max_timeout_ms {
            return Err(ExecutorError::InvalidConfig(format!(
                "default_timeout_ms {} must be in 1..={}",
                self.default_timeout_ms, self.max_timeout_ms
            )));
        }
        if self.default_memory_limit_mb < MIN_MEMORY_LIMIT_MB
            || self.default_memory_limit_mb > self.max_memory_limit_mb
        {
            return Err(ExecutorError::InvalidConfig(format!(
                "default_memory_limit_mb {} must be in {}..={}",
                self.default_memory_limit_mb, MIN_MEMORY_LIMIT_MB, self.max_memory_limit_mb
            )));
        }
        if !(MIN_NICENESS..=MAX_NICENESS).contains(&self.default_niceness) {
            return Err(ExecutorError::InvalidConfig(format!(
                "default_niceness {} must be in {}..={}",
                self.default_niceness, MIN_NICENESS, MAX_NICENESS
            )));
        }
        if self.max_output_bytes == 0 {
            return Err(ExecutorError::InvalidConfig(
                "max_output_bytes must be positive".to_string(),
            ));
        }
        if self.simulator_program.trim().is_empty() {
            return Err(ExecutorError::InvalidConfig(
                "simulator_program must not be empty".to_string(),
            ));
        }
        if let Some(root) = &self.working_root {
            if !root.is_absolute() {
                return Err(ExecutorError::InvalidConfig(format!(
                    "working_root '{}' must be an absolute path",
                    root.display()
                )));
            }
        }
        Ok(())
    }
}

fn check_range<T>(field: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(ExecutorError::PolicyOutOfBounds {
            field: field.to_string(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_matches_config() {
        let config = ExecutorConfig::default();
        let policy = config.default_policy();
        assert_eq!(policy.memory_limit_mb, 2048);
        assert_eq!(policy.niceness, 10);
        assert!(policy.restricted);
        assert_eq!(policy, ResourcePolicy::default());
    }

    #[test]
    fn test_overrides_within_bounds() {
        let config = ExecutorConfig::default();
        let policy = config
            .bounded_policy(PolicyOverrides {
                timeout_millis: Some(100),
                memory_limit_mb: Some(512),
                niceness: Some(19),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(policy.timeout_millis, 100);
        assert_eq!(policy.memory_limit_mb, 512);
        assert_eq!(policy.niceness, 19);
        assert!(policy.restricted);
    }

    #[test]
    fn test_overrides_out_of_bounds() {
        let config = ExecutorConfig {
            max_timeout_ms: 1000,
            ..Default::default()
        };
        let err = config
            .bounded_policy(PolicyOverrides {
                timeout_millis: Some(5000),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ExecutorError::PolicyOutOfBounds { ref field, .. } if field == "timeoutMillis"));

        let err = config
            .bounded_policy(PolicyOverrides {
                niceness: Some(-5),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ExecutorError::PolicyOutOfBounds { .. }));
    }

    #[test]
    fn test_validate_rejects_inverted_limits() {
        let config = ExecutorConfig {
            default_timeout_ms: 10_000,
            max_timeout_ms: 1_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ExecutorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_relative_working_root() {
        let config = ExecutorConfig {
            working_root: Some(PathBuf::from("jobs/scratch")),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ExecutorConfig {
            working_root: Some(PathBuf::from("/srv/simgate")),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
