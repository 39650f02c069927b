//! Declarative assertions over provider output.
//!
//! An [`Assertion`] is a typed predicate loaded from a test config. Checking
//! never fails: every check yields an [`AssertionResult`] whose `reason`
//! explains a failure, including malformed assertions such as a bad regex.

mod builder;
mod check;
mod json;
mod length;
mod parse;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use builder::Assert;
pub use parse::parse_all;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssertionKind {
    Contains,
    NotContains,
    Equals,
    Regex,
    StartsWith,
    EndsWith,
    Json,
    Length,
    /// Unrecognized kind, kept so it can fail with a useful reason.
    Other(String),
}

impl AssertionKind {
    pub fn as_str(&self) -> &str {
        match self {
            AssertionKind::Contains => "contains",
            AssertionKind::NotContains => "not-contains",
            AssertionKind::Equals => "equals",
            AssertionKind::Regex => "regex",
            AssertionKind::StartsWith => "starts-with",
            AssertionKind::EndsWith => "ends-with",
            AssertionKind::Json => "json",
            AssertionKind::Length => "length",
            AssertionKind::Other(name) => name,
        }
    }
}

impl From<&str> for AssertionKind {
    fn from(s: &str) -> Self {
        match s {
            "contains" => AssertionKind::Contains,
            "not-contains" => AssertionKind::NotContains,
            "equals" => AssertionKind::Equals,
            "regex" => AssertionKind::Regex,
            "starts-with" => AssertionKind::StartsWith,
            "ends-with" => AssertionKind::EndsWith,
            "json" => AssertionKind::Json,
            "length" => AssertionKind::Length,
            other => AssertionKind::Other(other.to_string()),
        }
    }
}

impl From<String> for AssertionKind {
    fn from(s: String) -> Self {
        AssertionKind::from(s.as_str())
    }
}

impl From<AssertionKind> for String {
    fn from(kind: AssertionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One predicate to check against an output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    #[serde(rename = "type")]
    pub kind: AssertionKind,
    pub value: Value,
    /// Selects a sub-value for `json` assertions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Assertion {
    pub fn new(kind: impl Into<AssertionKind>, value: impl Into<Value>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionResult {
    pub assertion: Assertion,
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expected: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub actual: String,
}

pub fn check_all(output: &str, assertions: &[Assertion]) -> Vec<AssertionResult> {
    assertions.iter().map(|a| a.check(output)).collect()
}

pub fn all_passed(results: &[AssertionResult]) -> bool {
    results.iter().all(|r| r.success)
}
