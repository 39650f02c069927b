//! `json` assertions.
//!
//! The output must parse as JSON. An optional `path` selects a sub-value,
//! either as a JSON Pointer (`/items/0/name`) or dotted (`items.0.name`).
//! When the assertion value is a JSON Schema (an object, or a string holding
//! one) the selected value must validate against it; any other value
//! (`true`, `"valid"`, empty) only asks for valid JSON.

use serde_json::Value;

type Outcome = (bool, Option<String>);

pub(super) fn check_json(output: &str, value: &Value, path: Option<&str>) -> Outcome {
    let document: Value = match serde_json::from_str(output) {
        Ok(document) => document,
        Err(e) => return (false, Some(format!("output is not valid JSON: {e}"))),
    };

    let selected = match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) => match select(&document, path) {
            Some(selected) => selected,
            None => return (false, Some(format!("JSON path not found: {path}"))),
        },
        None => &document,
    };

    let schema = match schema_of(value) {
        Ok(Some(schema)) => schema,
        Ok(None) => return (true, None),
        Err(reason) => return (false, Some(reason)),
    };

    let validator = match jsonschema::validator_for(&schema) {
        Ok(validator) => validator,
        Err(e) => return (false, Some(format!("invalid JSON schema: {e}"))),
    };

    let violations: Vec<String> = validator
        .iter_errors(selected)
        .map(|error| error.to_string())
        .collect();

    if violations.is_empty() {
        (true, None)
    } else {
        (
            false,
            Some(format!(
                "JSON schema validation failed: {}",
                violations.join("; ")
            )),
        )
    }
}

/// The schema carried by an assertion value, if any.
fn schema_of(value: &Value) -> Result<Option<Value>, String> {
    match value {
        Value::Object(_) => Ok(Some(value.clone())),
        Value::String(text) if text.trim_start().starts_with('{') => {
            serde_json::from_str(text)
                .map(Some)
                .map_err(|e| format!("invalid JSON schema: {e}"))
        }
        _ => Ok(None),
    }
}

fn select<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    if path.starts_with('/') {
        return document.pointer(path);
    }

    let dotted = path.strip_prefix("$.").or_else(|| path.strip_prefix('$')).unwrap_or(path);
    dotted
        .split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(document, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}
