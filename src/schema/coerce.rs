// Numeric-string coercion, applied before schema validation when enabled

use serde_json::{Number, Value};

/// Replace numeric strings with numbers wherever the schema asks for one
///
/// Walks `properties` and `items` of the schema alongside the value. Strings
/// that do not parse are left untouched so the validator reports them.
pub fn coerce_numeric_strings(schema: &Value, value: &mut Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::Object(properties)) = schema.get("properties") {
                for (key, sub_schema) in properties {
                    if let Some(field) = map.get_mut(key) {
                        coerce_numeric_strings(sub_schema, field);
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items.iter_mut() {
                    coerce_numeric_strings(item_schema, item);
                }
            }
        }
        Value::String(s) => {
            if let Some(number) = parse_for(schema, s) {
                *value = Value::Number(number);
            }
        }
        _ => {}
    }
}

fn parse_for(schema: &Value, s: &str) -> Option<Number> {
    let types = declared_types(schema);
    if types.iter().any(|t| *t == "string") {
        return None;
    }
    let text = s.trim();
    if types.iter().any(|t| *t == "integer") {
        if let Ok(n) = text.parse::<i64>() {
            return Some(Number::from(n));
        }
        if let Ok(n) = text.parse::<u64>() {
            return Some(Number::from(n));
        }
    }
    if types.iter().any(|t| *t == "number") {
        return text.parse::<f64>().ok().and_then(Number::from_f64);
    }
    None
}

fn declared_types(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}
