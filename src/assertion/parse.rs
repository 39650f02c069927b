use serde_json::{Map, Value};

use super::{Assertion, AssertionKind};
use crate::error::{PeError, Result};

impl Assertion {
    /// Build an assertion from a loosely typed map as found in test configs.
    ///
    /// `type` must be a string and `value` must be present (it may be null);
    /// `path` is optional.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let kind = map
            .get("type")
            .and_then(Value::as_str)
            .ok_or(PeError::AssertionMissingField { field: "type" })?;
        let value = map
            .get("value")
            .ok_or(PeError::AssertionMissingField { field: "value" })?;
        let path = map.get("path").and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            kind: AssertionKind::from(kind),
            value: value.clone(),
            path,
        })
    }
}

/// Parse a list of raw assertions. Errors name the failing index.
pub fn parse_all(items: &[Value]) -> Result<Vec<Assertion>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let map = item
                .as_object()
                .ok_or(PeError::AssertionNotMap { index })?;
            Assertion::from_map(map).map_err(|e| match e {
                PeError::AssertionMissingField { field } => PeError::AssertionField { index, field },
                other => other,
            })
        })
        .collect()
}
