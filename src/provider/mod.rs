//! Completion providers.
//!
//! A provider turns a rendered prompt into text. Only local providers ship
//! with `pe`; anything else plugs in through `exec:<command>`.

mod echo;
mod exec;
mod mock;
mod registry;

use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use echo::EchoProvider;
pub use exec::ExecProvider;
pub use mock::MockProvider;
pub use registry::{ProviderFactory, ProviderRegistry};

use crate::error::{PeError, Result};
use crate::template::Variables;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

impl TokenUsage {
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self {
            prompt,
            completion,
            total: prompt + completion,
        }
    }

    /// Rough usage estimate from whitespace-separated word counts.
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        Self::new(word_count(prompt), word_count(completion))
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt += other.prompt;
        self.completion += other.completion;
        self.total += other.total;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Variables of the test case being evaluated.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: Variables,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
    /// Upper bound for a single completion call.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl CompletionParams {
    /// Pick the known keys out of a config `options` map; the rest goes to
    /// `extra`.
    pub fn from_options(options: &serde_json::Map<String, Value>) -> Self {
        let mut params = Self::default();
        for (key, value) in options {
            match key.as_str() {
                "model" => params.model = value.as_str().map(str::to_string),
                "temperature" => params.temperature = value.as_f64(),
                "max_tokens" | "maxTokens" => {
                    params.max_tokens = value.as_u64().and_then(|n| u32::try_from(n).ok())
                }
                _ => {
                    params.extra.insert(key.clone(), value.clone());
                }
            }
        }
        params
    }

    pub fn with_vars(mut self, vars: Variables) -> Self {
        self.vars = vars;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

pub trait Provider: fmt::Debug + Send + Sync {
    /// Identifier as written in configs, e.g. `mock` or `exec:./run.sh`.
    fn id(&self) -> &str;

    fn complete(&self, prompt: &str, params: &CompletionParams) -> Result<Completion>;
}

/// Split a provider spec `name[:model]`.
pub fn parse_spec(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once(':') {
        Some((name, model)) => (name, Some(model)),
        None => (spec, None),
    }
}

/// Parse a duration such as `30s`, `500ms`, `1.5m` or `1m30s`.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let invalid = || PeError::InvalidDuration {
        value: value.to_string(),
    };

    let mut rest = value.trim();
    if rest.is_empty() {
        return Err(invalid());
    }
    let mut total = Duration::ZERO;
    while !rest.is_empty() {
        let split = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let (number, tail) = rest.split_at(split);
        let number: f64 = number.parse().map_err(|_| invalid())?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let seconds = match unit {
            "ms" => number / 1000.0,
            "s" => number,
            "m" => number * 60.0,
            "h" => number * 3600.0,
            _ => return Err(invalid()),
        };
        total += Duration::try_from_secs_f64(seconds).map_err(|_| invalid())?;
        rest = tail;
    }
    Ok(total)
}

pub fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}
