use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::assertion::{parse_all, Assertion};
use crate::error::{PeError, Result};
use crate::template::Variables;

/// An evaluation config: every prompt is run against every provider for
/// every test case.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub prompts: Vec<String>,

    #[serde(default)]
    pub providers: Vec<String>,

    #[serde(default)]
    pub tests: Vec<TestCase>,

    /// Provider options such as `temperature` or `max_tokens`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TestCase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<Map<String, Value>>,

    /// Raw assertion list, parsed on demand so validation can point at the
    /// offending entry.
    #[serde(default, rename = "assert", skip_serializing_if = "Option::is_none")]
    pub assertions: Option<Value>,

    /// Keys this crate does not interpret, kept for round-tripping.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestCase {
    pub fn variables(&self) -> Variables {
        self.vars
            .iter()
            .flatten()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn parse_assertions(&self) -> Result<Vec<Assertion>> {
        match &self.assertions {
            Some(Value::Array(items)) => parse_all(items),
            _ => Ok(Vec::new()),
        }
    }
}

impl TestConfig {
    /// Check that the config can be evaluated.
    pub fn validate(&self) -> Result<()> {
        if self.prompts.is_empty() {
            return Err(invalid("no prompts specified"));
        }
        if self.providers.is_empty() {
            return Err(invalid("no providers specified"));
        }
        if self.tests.is_empty() {
            return Err(invalid("no tests specified"));
        }

        for (i, test) in self.tests.iter().enumerate() {
            if test.vars.is_none() {
                return Err(invalid(format!("test {i} is missing 'vars' field")));
            }
            match &test.assertions {
                None => return Err(invalid(format!("test {i} is missing 'assert' field"))),
                Some(Value::Array(items)) if !items.is_empty() => {
                    parse_all(items).map_err(|e| invalid(format!("test {i}: {e}")))?;
                }
                Some(_) => {
                    return Err(invalid(format!(
                        "test {i} has invalid or empty 'assert' list"
                    )))
                }
            }
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> PeError {
    PeError::ConfigInvalid {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const VALID: &str = r#"
description: capitals
prompts:
  - "What is the capital of {{country}}?"
providers:
  - mock
tests:
  - vars:
      country: France
    assert:
      - type: contains
        value: Paris
"#;

    fn config(yaml: &str) -> TestConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_config() {
        let config = config(VALID);
        assert!(config.validate().is_ok());
        assert_eq!(config.description.as_deref(), Some("capitals"));

        let test = &config.tests[0];
        assert_eq!(test.variables()["country"], "France");
        assert_eq!(test.parse_assertions().unwrap().len(), 1);
    }

    #[rstest]
    #[case("providers: [mock]\ntests: [{vars: {}, assert: [{type: equals, value: x}]}]", "no prompts specified")]
    #[case("prompts: [p]\ntests: [{vars: {}, assert: [{type: equals, value: x}]}]", "no providers specified")]
    #[case("prompts: [p]\nproviders: [mock]", "no tests specified")]
    #[case("prompts: [p]\nproviders: [mock]\ntests: [{assert: [{type: equals, value: x}]}]", "test 0 is missing 'vars' field")]
    #[case("prompts: [p]\nproviders: [mock]\ntests: [{vars: {}}]", "test 0 is missing 'assert' field")]
    #[case("prompts: [p]\nproviders: [mock]\ntests: [{vars: {}, assert: []}]", "test 0 has invalid or empty 'assert' list")]
    #[case("prompts: [p]\nproviders: [mock]\ntests: [{vars: {}, assert: x}]", "test 0 has invalid or empty 'assert' list")]
    #[case("prompts: [p]\nproviders: [mock]\ntests: [{vars: {}, assert: [{value: x}]}]", "test 0: invalid assertion 0: missing 'type' field")]
    fn test_validation_messages(#[case] yaml: &str, #[case] message: &str) {
        let err = config(yaml).validate().unwrap_err();
        assert_eq!(err.to_string(), format!("Invalid config: {message}"));
    }

    #[test]
    fn test_unknown_test_keys_round_trip() {
        let config = config(
            "prompts: [p]\nproviders: [mock]\ntests:\n  - vars: {a: 1}\n    assert: [{type: equals, value: x}]\n    threshold: 0.5\n",
        );
        assert_eq!(config.tests[0].extra["threshold"], 0.5);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["tests"][0]["threshold"], 0.5);
    }
}
