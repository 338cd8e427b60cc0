// Gateway configuration: defaults -> TOML file -> environment

use crate::comm::{CommConfig, Transport};
use crate::executor::ExecutorConfig;
use crate::jobs::JobsConfig;
use crate::schema::SchemaConfig;
use crate::security::SecurityPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Variable naming the TOML file
pub const CONFIG_PATH_VAR: &str = "SIMGATE_CONFIG";
/// File read when `SIMGATE_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "simgate.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Whole-daemon configuration, one section per module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub comm: CommConfig,
    pub executor: ExecutorConfig,
    pub security: SecurityPolicy,
    pub jobs: JobsConfig,
    pub schema: SchemaConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace | debug | info | warn | error
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Parse a variable, logging a warning if the value is present but invalid.
fn parse_var<T, L>(lookup: &L, name: &str, default: T) -> T
where
    T: std::str::FromStr,
    L: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) => match v.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(var = name, value = %v, "Invalid env var value, using default");
                default
            }
        },
        None => default,
    }
}

impl GatewayConfig {
    /// Load defaults, then the TOML file, then environment overrides
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = Self::from_file_or_default(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse `path`; a missing file yields the defaults, a malformed one is an error
    pub fn from_file_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }

    /// Apply `SIMGATE_*` overrides read through `lookup`
    pub fn apply_overrides<L>(&mut self, lookup: L)
    where
        L: Fn(&str) -> Option<String>,
    {
        let comm = &mut self.comm;
        comm.transport = parse_var::<Transport, _>(&lookup, "SIMGATE_TRANSPORT", comm.transport);
        if let Some(addr) = lookup("SIMGATE_LISTEN_ADDR") {
            comm.listen_addr = addr.trim().to_string();
        }
        comm.listen_port = parse_var(&lookup, "SIMGATE_LISTEN_PORT", comm.listen_port);
        comm.max_line_bytes = parse_var(&lookup, "SIMGATE_MAX_LINE_BYTES", comm.max_line_bytes);

        let exec = &mut self.executor;
        exec.default_timeout_ms =
            parse_var(&lookup, "SIMGATE_DEFAULT_TIMEOUT_MS", exec.default_timeout_ms);
        exec.default_memory_limit_mb =
            parse_var(&lookup, "SIMGATE_DEFAULT_MEMORY_MB", exec.default_memory_limit_mb);
        exec.default_niceness = parse_var(&lookup, "SIMGATE_DEFAULT_NICENESS", exec.default_niceness);
        exec.restricted = parse_var(&lookup, "SIMGATE_RESTRICTED", exec.restricted);
        exec.max_output_bytes = parse_var(&lookup, "SIMGATE_MAX_OUTPUT_BYTES", exec.max_output_bytes);
        if let Some(program) = lookup("SIMGATE_SIMULATOR_PROGRAM") {
            exec.simulator_program = program.trim().to_string();
        }
        if let Some(root) = lookup("SIMGATE_WORKING_ROOT") {
            let root = root.trim();
            exec.working_root = (!root.is_empty()).then(|| root.into());
        }

        if let Some(list) = lookup("SIMGATE_ALLOWED_PROGRAMS") {
            self.security.allowed_programs = list
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }

        self.jobs.retention_secs =
            parse_var(&lookup, "SIMGATE_JOB_RETENTION_SECS", self.jobs.retention_secs);
        self.schema.coerce_numeric_strings = parse_var(
            &lookup,
            "SIMGATE_COERCE_NUMERIC",
            self.schema.coerce_numeric_strings,
        );
        if let Some(level) = lookup("SIMGATE_LOG_LEVEL") {
            self.log.level = level.trim().to_ascii_lowercase();
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.executor
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.executor.simulator_program.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "executor.simulator_program must not be empty".to_string(),
            ));
        }
        if self.security.allowed_programs.is_empty() {
            return Err(ConfigError::Invalid(
                "security.allowed_programs must not be empty".to_string(),
            ));
        }
        if self.comm.max_line_bytes == 0 {
            return Err(ConfigError::Invalid("comm.max_line_bytes must be > 0".to_string()));
        }
        if self.comm.max_connections == 0 {
            return Err(ConfigError::Invalid("comm.max_connections must be > 0".to_string()));
        }
        if self.comm.transport == Transport::Tcp {
            self.comm.bind_addr().map_err(|e| {
                ConfigError::Invalid(format!(
                    "comm.listen_addr '{}' is not a valid address: {}",
                    self.comm.listen_addr, e
                ))
            })?;
        }
        if self.level().is_none() {
            return Err(ConfigError::Invalid(format!(
                "log.level '{}' is not one of trace, debug, info, warn, error",
                self.log.level
            )));
        }
        Ok(())
    }

    /// Log level as a tracing level
    pub fn level(&self) -> Option<tracing::Level> {
        self.log.level.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = GatewayConfig::default();
        config.validate().unwrap();
        assert_eq!(config.comm.listen_port, 9710);
        assert_eq!(config.jobs.retention_secs, 3600);
        assert!(config.schema.coerce_numeric_strings);
        assert_eq!(config.level(), Some(tracing::Level::INFO));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        config.apply_overrides(lookup(&[
            ("SIMGATE_TRANSPORT", "stdio"),
            ("SIMGATE_LISTEN_PORT", "9999"),
            ("SIMGATE_DEFAULT_TIMEOUT_MS", "5000"),
            ("SIMGATE_RESTRICTED", "false"),
            ("SIMGATE_ALLOWED_PROGRAMS", "ruby, openstudio,,"),
            ("SIMGATE_COERCE_NUMERIC", "false"),
            ("SIMGATE_LOG_LEVEL", "DEBUG"),
            ("SIMGATE_WORKING_ROOT", "/srv/simgate"),
        ]));
        assert_eq!(config.comm.transport, Transport::Stdio);
        assert_eq!(
            config.executor.working_root.as_deref(),
            Some(std::path::Path::new("/srv/simgate"))
        );
        assert_eq!(config.comm.listen_port, 9999);
        assert_eq!(config.executor.default_timeout_ms, 5000);
        assert!(!config.executor.restricted);
        assert_eq!(config.security.allowed_programs, vec!["ruby", "openstudio"]);
        assert!(!config.schema.coerce_numeric_strings);
        assert_eq!(config.level(), Some(tracing::Level::DEBUG));
    }

    #[test]
    fn test_invalid_env_value_keeps_default() {
        let mut config = GatewayConfig::default();
        config.apply_overrides(lookup(&[
            ("SIMGATE_LISTEN_PORT", "not-a-port"),
            ("SIMGATE_TRANSPORT", "carrier-pigeon"),
        ]));
        assert_eq!(config.comm.listen_port, 9710);
        assert_eq!(config.comm.transport, Transport::Tcp);
    }

    #[test]
    fn test_validation_rejects_bad_bounds() {
        let mut config = GatewayConfig::default();
        config.executor.default_timeout_ms = config.executor.max_timeout_ms + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = GatewayConfig::default();
        config.security.allowed_programs.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = GatewayConfig::default();
        config.log.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GatewayConfig::from_file_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simgate.toml");
        std::fs::write(
            &path,
            r#"
[comm]
transport = "stdio"

[executor]
default_niceness = 5
simulator_program = "/opt/openstudio/bin/openstudio"

[jobs]
retention_secs = 60
"#,
        )
        .unwrap();

        let config = GatewayConfig::from_file_or_default(&path).unwrap();
        assert_eq!(config.comm.transport, Transport::Stdio);
        assert_eq!(config.comm.listen_port, 9710);
        assert_eq!(config.executor.default_niceness, 5);
        assert_eq!(config.executor.default_memory_limit_mb, 2048);
        assert_eq!(config.jobs.retention_secs, 60);
        assert_eq!(config.jobs.reap_interval_secs, 30);
        config.validate().unwrap();
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simgate.toml");
        std::fs::write(&path, "[comm\nport = ").unwrap();
        assert!(matches!(
            GatewayConfig::from_file_or_default(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
