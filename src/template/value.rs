use std::collections::BTreeMap;

use serde_json::Value;

/// Variables available to a template, keyed by case-sensitive name.
pub type Variables = BTreeMap<String, Value>;

/// String form of a variable value as it appears in rendered output.
///
/// Strings are used verbatim, numbers and booleans use their natural textual
/// form, and structured values are JSON-encoded.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Truthiness used by bare `#if name` conditions.
///
/// Numeric zero is falsy by value, so `0`, `0.0` and `-0` all count as false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}
