use serde_json::Value;

use super::check::PASSED;
use super::{Assertion, AssertionKind, AssertionResult};

/// Fluent checks against one input, collecting every result.
///
/// ```
/// use pe::assertion::Assert;
///
/// let mut check = Assert::new("The capital of France is Paris.");
/// check.contains("Paris");
/// check.length_in_range(10, 40);
/// assert!(check.all_passed());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Assert {
    input: String,
    results: Vec<AssertionResult>,
}

impl Assert {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            results: Vec::new(),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    fn record(&mut self, result: AssertionResult) -> bool {
        let success = result.success;
        self.results.push(result);
        success
    }

    fn run(&mut self, assertion: Assertion) -> bool {
        let result = assertion.check(&self.input);
        self.record(result)
    }

    pub fn contains(&mut self, substr: &str) -> bool {
        self.run(Assertion::new(AssertionKind::Contains, substr))
    }

    pub fn not_contains(&mut self, substr: &str) -> bool {
        self.run(Assertion::new(AssertionKind::NotContains, substr))
    }

    pub fn equals(&mut self, expected: &str) -> bool {
        self.run(Assertion::new(AssertionKind::Equals, expected))
    }

    pub fn starts_with(&mut self, prefix: &str) -> bool {
        self.run(Assertion::new(AssertionKind::StartsWith, prefix))
    }

    pub fn ends_with(&mut self, suffix: &str) -> bool {
        self.run(Assertion::new(AssertionKind::EndsWith, suffix))
    }

    pub fn matches_regex(&mut self, pattern: &str) -> bool {
        self.run(Assertion::new(AssertionKind::Regex, pattern))
    }

    pub fn length_equals(&mut self, length: usize) -> bool {
        self.run(Assertion::new(AssertionKind::Length, length))
    }

    pub fn length_greater_than(&mut self, length: usize) -> bool {
        self.run(Assertion::new(AssertionKind::Length, format!(">{length}")))
    }

    pub fn length_less_than(&mut self, length: usize) -> bool {
        self.run(Assertion::new(AssertionKind::Length, format!("<{length}")))
    }

    /// Inclusive at both ends.
    pub fn length_in_range(&mut self, min: usize, max: usize) -> bool {
        let assertion = Assertion::new(AssertionKind::Length, format!(">={min},<={max}"));
        let mut result = assertion.check(&self.input);
        result.expected = format!("between {min} and {max}");
        if !result.success {
            let actual = self.input.chars().count();
            result.reason = format!("output length {actual} is not between {min} and {max}");
        }
        self.record(result)
    }

    pub fn is_valid_json(&mut self) -> bool {
        let mut result = Assertion::new(AssertionKind::Json, "valid").check(&self.input);
        result.expected = "valid JSON".to_string();
        self.record(result)
    }

    pub fn matches_json_schema(&mut self, schema: &str) -> bool {
        let mut result = Assertion::new(AssertionKind::Json, schema).check(&self.input);
        result.expected = "JSON matching schema".to_string();
        self.record(result)
    }

    /// Run a caller-supplied predicate returning `(success, reason)`. An
    /// empty reason is replaced with a generic one.
    pub fn custom<F>(&mut self, name: &str, check: F) -> bool
    where
        F: FnOnce(&str) -> (bool, String),
    {
        let (success, reason) = check(&self.input);
        let reason = match (success, reason.is_empty()) {
            (true, true) => PASSED.to_string(),
            (false, true) => "custom assertion failed".to_string(),
            _ => reason,
        };

        self.record(AssertionResult {
            assertion: Assertion::new(
                AssertionKind::Other(format!("custom:{name}")),
                Value::String(name.to_string()),
            ),
            success,
            reason,
            expected: "custom assertion".to_string(),
            actual: self.input.clone(),
        })
    }

    pub fn all_passed(&self) -> bool {
        super::all_passed(&self.results)
    }

    pub fn results(&self) -> &[AssertionResult] {
        &self.results
    }

    pub fn failures(&self) -> Vec<&AssertionResult> {
        self.results.iter().filter(|r| !r.success).collect()
    }
}
