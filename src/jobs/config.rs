use serde::{Deserialize, Serialize};

/// Job registry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// How long a finished job stays readable before the reaper drops it
    pub retention_secs: u64,
    /// How often the reaper runs
    pub reap_interval_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            retention_secs: 3600,
            reap_interval_secs: 30,
        }
    }
}
