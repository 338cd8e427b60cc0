// Security configuration
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// Deny-lists, allow-lists and the parameter names the security sweep inspects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityPolicy {
    /// Program names a command field may start with (exact, or a path ending in `/<name>`)
    pub allowed_programs: Vec<String>,
    /// Substrings that make a path or command unsafe (matched case-insensitively)
    pub denied_patterns: Vec<String>,
    /// Parameter names treated as filesystem paths
    pub path_fields: Vec<String>,
    /// Parameter names treated as commands
    pub command_fields: Vec<String>,
    /// Parameter names holding process arguments
    pub argument_fields: Vec<String>,
}

/// Directory traversal sequences, always rejected regardless of configuration
pub const TRAVERSAL_PATTERNS: &[&str] = &["../", "..\\"];

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            allowed_programs: to_strings(&["openstudio", "energyplus", "EnergyPlus", "ruby"]),
            denied_patterns: to_strings(&[
                ";", "&&", "||", "|", ">", "<", "`", "$(", "${", "\n", "\r", "\0", "rm -rf",
                "del /s", "mkfs", "dd if=",
            ]),
            path_fields: to_strings(&[
                "path",
                "modelPath",
                "outputDirectory",
                "weatherFile",
                "outputPath",
                "inputModelPath",
                "measurePath",
                "workflowPath",
                "workingDirectory",
                "epwPath",
                "filePath",
                "directory",
            ]),
            command_fields: to_strings(&["command"]),
            argument_fields: to_strings(&["args"]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
