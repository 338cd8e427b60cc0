// Parameter summaries that are safe to log at info level

use crate::security::config::SecurityPolicy;
use serde_json::{Map, Value};

/// One-line summary of a parameter map: keys with value kinds only
///
/// Watched fields (paths, commands, arguments) never show content. Other
/// strings show their length, never their text.
pub fn redact_params(params: &Map<String, Value>, policy: &SecurityPolicy) -> String {
    let parts: Vec<String> = params
        .iter()
        .map(|(key, value)| {
            let watched = policy.path_fields.contains(key)
                || policy.command_fields.contains(key)
                || policy.argument_fields.contains(key);
            if watched {
                format!("{}=<redacted {}>", key, kind(value))
            } else {
                format!("{}={}", key, kind(value))
            }
        })
        .collect();
    format!("{{{}}}", parts.join(", "))
}

fn kind(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(s) => format!("string({})", s.chars().count()),
        Value::Array(items) => format!("array({})", items.len()),
        Value::Object(map) => format!("object({})", map.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redacts_watched_fields() {
        let params = json!({
            "path": "../../etc/passwd",
            "message": "hi",
            "args": ["a", "b"],
            "timeoutMillis": 100
        });
        let summary = redact_params(params.as_object().unwrap(), &SecurityPolicy::default());
        assert!(!summary.contains("passwd"));
        assert!(!summary.contains("hi"));
        assert!(summary.contains("path=<redacted string(16)>"));
        assert!(summary.contains("args=<redacted array(2)>"));
        assert!(summary.contains("message=string(2)"));
        assert!(summary.contains("timeoutMillis=number"));
    }

    #[test]
    fn test_empty_params() {
        let summary = redact_params(&Map::new(), &SecurityPolicy::default());
        assert_eq!(summary, "{}");
    }
}
