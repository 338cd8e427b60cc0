use serde::{Deserialize, Serialize};

/// Schema validation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Accept numeric strings ("100") where a schema asks for a number or integer.
    /// This is the only coercion performed.
    pub coerce_numeric_strings: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            coerce_numeric_strings: true,
        }
    }
}
