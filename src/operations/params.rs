// Typed parameters, deserialized after schema validation

use crate::executor::PolicyOverrides;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommandRunParams {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub timeout_millis: Option<u64>,
    #[serde(rename = "memoryLimitMB")]
    pub memory_limit_mb: Option<u64>,
    pub niceness: Option<i32>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub background: bool,
}

impl CommandRunParams {
    pub fn overrides(&self) -> PolicyOverrides {
        PolicyOverrides {
            working_directory: self.working_directory.clone(),
            environment: self.environment.clone(),
            timeout_millis: self.timeout_millis,
            memory_limit_mb: self.memory_limit_mb,
            niceness: self.niceness,
        }
    }

    /// Program and full argument vector: `command` split on whitespace, then `args`
    ///
    /// No quoting rules apply; an argument containing spaces goes in `args`.
    pub fn argv(&self) -> Option<(String, Vec<String>)> {
        let mut words = self.command.split_whitespace().map(str::to_string);
        let program = words.next()?;
        let mut args: Vec<String> = words.collect();
        args.extend(self.args.iter().cloned());
        Some((program, args))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SimulationRunParams {
    pub workflow_path: PathBuf,
    #[serde(default)]
    pub measures_only: bool,
    pub timeout_millis: Option<u64>,
    #[serde(rename = "memoryLimitMB")]
    pub memory_limit_mb: Option<u64>,
}

impl SimulationRunParams {
    /// Simulator arguments: `run [--measures_only] --workflow <path>`
    pub fn simulator_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string()];
        if self.measures_only {
            args.push("--measures_only".to_string());
        }
        args.push("--workflow".to_string());
        args.push(self.workflow_path.to_string_lossy().into_owned());
        args
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobStatusParams {
    pub job_id: String,
    #[serde(default)]
    pub consume: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobIdParams {
    pub job_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoParams {}
