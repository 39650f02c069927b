use regex_lite::Regex;

use super::json::check_json;
use super::length::check_length;
use super::{Assertion, AssertionKind, AssertionResult};
use crate::template::value_to_string;

pub(super) const PASSED: &str = "Assertion passed";

impl Assertion {
    /// Check this assertion against `output`.
    pub fn check(&self, output: &str) -> AssertionResult {
        let expected = value_to_string(&self.value);
        let (success, reason) = self.evaluate(output, &expected);

        let reason = match reason {
            Some(reason) => reason,
            None if success => PASSED.to_string(),
            None => String::new(),
        };

        AssertionResult {
            assertion: self.clone(),
            success,
            reason,
            expected,
            actual: output.to_string(),
        }
    }

    fn evaluate(&self, output: &str, expected: &str) -> (bool, Option<String>) {
        match &self.kind {
            AssertionKind::Contains => fail_unless(
                output.contains(expected),
                || format!("output does not contain expected string: {expected}"),
            ),
            AssertionKind::NotContains => fail_unless(
                !output.contains(expected),
                || format!("output contains string that should not be present: {expected}"),
            ),
            AssertionKind::Equals => fail_unless(output == expected, || {
                "output does not match expected string".to_string()
            }),
            AssertionKind::Regex => match Regex::new(expected) {
                Ok(re) => fail_unless(re.is_match(output), || {
                    format!("output does not match regex pattern: {expected}")
                }),
                Err(e) => (false, Some(format!("invalid regex pattern: {e}"))),
            },
            AssertionKind::StartsWith => fail_unless(output.starts_with(expected), || {
                format!("output does not start with: {expected}")
            }),
            AssertionKind::EndsWith => fail_unless(output.ends_with(expected), || {
                format!("output does not end with: {expected}")
            }),
            AssertionKind::Json => check_json(output, &self.value, self.path.as_deref()),
            AssertionKind::Length => check_length(&self.value, output.chars().count()),
            AssertionKind::Other(name) => (false, Some(format!("unknown assertion type: {name}"))),
        }
    }
}

fn fail_unless(success: bool, reason: impl FnOnce() -> String) -> (bool, Option<String>) {
    if success {
        (true, None)
    } else {
        (false, Some(reason()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    const OUTPUT: &str = "The capital of France is Paris.";

    #[rstest]
    #[case("contains", json!("Paris"), true)]
    #[case("contains", json!("paris"), false)]
    #[case("not-contains", json!("Tokyo"), true)]
    #[case("not-contains", json!("France"), false)]
    #[case("equals", json!("The capital of France is Paris."), true)]
    #[case("equals", json!("The capital of France is Paris"), false)]
    #[case("regex", json!(r"capital of \w+"), true)]
    #[case("regex", json!("^Paris"), false)]
    #[case("starts-with", json!("The"), true)]
    #[case("starts-with", json!("Paris"), false)]
    #[case("ends-with", json!("Paris."), true)]
    #[case("ends-with", json!("France"), false)]
    #[case("length", json!(31), true)]
    #[case("length", json!(">=10,<=40"), true)]
    #[case("length", json!("<5"), false)]
    fn test_check(#[case] kind: &str, #[case] value: serde_json::Value, #[case] success: bool) {
        let result = Assertion::new(kind, value).check(OUTPUT);
        assert_eq!(result.success, success, "reason: {}", result.reason);
        assert_eq!(result.actual, OUTPUT);
    }

    #[test]
    fn test_failure_reason_names_expected() {
        let result = Assertion::new(AssertionKind::Contains, "Tokyo").check(OUTPUT);
        assert!(!result.success);
        assert_eq!(result.reason, "output does not contain expected string: Tokyo");
        assert_eq!(result.expected, "Tokyo");
    }

    #[test]
    fn test_success_reason() {
        let result = Assertion::new(AssertionKind::Contains, "Paris").check(OUTPUT);
        assert_eq!(result.reason, "Assertion passed");
    }

    #[test]
    fn test_invalid_regex_fails_without_panic() {
        let result = Assertion::new(AssertionKind::Regex, "(unclosed").check(OUTPUT);
        assert!(!result.success);
        assert!(result.reason.starts_with("invalid regex pattern: "));
    }

    #[test]
    fn test_unknown_kind_fails() {
        let result = Assertion::new("similar", "x").check(OUTPUT);
        assert!(!result.success);
        assert_eq!(result.reason, "unknown assertion type: similar");
    }

    #[test]
    fn test_non_string_values_are_coerced() {
        let result = Assertion::new(AssertionKind::Contains, 42).check("answer: 42");
        assert!(result.success);
        assert_eq!(result.expected, "42");
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!Assertion::new(AssertionKind::Equals, "PARIS").check("Paris").success);
    }
}
