//! Runs every prompt against every provider for every test case.

pub mod report;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::assertion::{all_passed, check_all, AssertionResult};
use crate::config::{resolve_prompt, TestCase, TestConfig};
use crate::error::Result;
use crate::provider::{Completion, CompletionParams, Provider, ProviderRegistry, TokenUsage};
use crate::template::{Template, Variables, DEFAULT_ESCAPE_MARKER, DEFAULT_MAX_DEPTH};

pub use report::{format_report, read_report, write_report, ReportFormat};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptInfo {
    /// Prompt text after rendering, or the source text if rendering failed.
    pub raw: String,
    /// Prompt as written in the config.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalResult {
    pub id: String,
    pub prompt_idx: usize,
    pub test_idx: usize,
    pub prompt: PromptInfo,
    pub provider: String,
    #[serde(default)]
    pub vars: Variables,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Completion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub assertions: Vec<AssertionResult>,
    pub success: bool,
    #[serde(default)]
    pub latency_ms: f64,
}

impl EvalResult {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn output(&self) -> &str {
        self.response.as_ref().map_or("", |r| r.text.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub successes: usize,
    pub failures: usize,
    pub errors: usize,
    #[serde(default)]
    pub token_usage: TokenUsage,
}

impl Stats {
    pub fn record(&mut self, result: &EvalResult) {
        if result.is_error() {
            self.errors += 1;
        } else if result.success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        if let Some(response) = &result.response {
            self.token_usage += response.usage;
        }
    }

    pub fn total(&self) -> usize {
        self.successes + self.failures + self.errors
    }

    /// Percentage of results that passed, 0 when there are none.
    pub fn pass_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.successes as f64 / total as f64 * 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalReport {
    pub eval_id: String,
    pub timestamp: String,
    #[serde(default)]
    pub duration_ms: f64,
    pub results: Vec<EvalResult>,
    pub stats: Stats,
}

impl EvalReport {
    pub fn all_passed(&self) -> bool {
        self.stats.failures == 0 && self.stats.errors == 0
    }
}

/// Identifier for one evaluation run, derived from the local time.
pub fn eval_id() -> String {
    format!("eval-{}", chrono::Local::now().format("%Y%m%dT%H%M%S"))
}

/// Stable id for a prompt/provider/vars combination.
pub fn result_id(prompt: &str, provider: &str, vars: &Variables) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(b"\0");
    hasher.update(provider.as_bytes());
    hasher.update(b"\0");
    // BTreeMap keeps key order fixed, so the JSON form is stable.
    hasher.update(serde_json::to_string(vars).unwrap_or_default().as_bytes());
    let digest = hasher.finalize();
    let hash: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("r{hash}")
}

/// Evaluates a [`TestConfig`] with providers from a registry.
#[derive(Debug)]
pub struct Evaluator<'r> {
    registry: &'r ProviderRegistry,
    base_dir: PathBuf,
    max_depth: usize,
    escape_marker: String,
    dry_run: bool,
    timeout: Option<Duration>,
}

/// A prompt/provider/test triple being evaluated.
struct Unit<'c> {
    prompt_idx: usize,
    test_idx: usize,
    label: &'c str,
    source: &'c str,
    provider_spec: &'c str,
    test: &'c TestCase,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r ProviderRegistry) -> Self {
        Self {
            registry,
            base_dir: PathBuf::from("."),
            max_depth: DEFAULT_MAX_DEPTH,
            escape_marker: DEFAULT_ESCAPE_MARKER.to_string(),
            dry_run: false,
            timeout: None,
        }
    }

    /// Directory for `file://` prompts and template inclusions, normally the
    /// config file's directory.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_escape_marker(mut self, marker: impl Into<String>) -> Self {
        self.escape_marker = marker.into();
        self
    }

    /// Limit each provider call; a call that runs longer fails its unit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Render prompts without calling providers or checking assertions.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run the whole config. Only an invalid config or an unreadable prompt
    /// file fails the run; errors in a single unit are recorded on its
    /// result.
    pub fn run(&self, config: &TestConfig) -> Result<EvalReport> {
        config.validate()?;

        let started = Instant::now();
        let eval_id = eval_id();
        let timestamp = chrono::Local::now().to_rfc3339();

        let sources = config
            .prompts
            .iter()
            .map(|p| resolve_prompt(p, &self.base_dir))
            .collect::<Result<Vec<_>>>()?;

        let providers: Vec<(&str, std::result::Result<Arc<dyn Provider>, String>)> = config
            .providers
            .iter()
            .map(|spec| {
                let provider = self.registry.get(spec).map_err(|e| {
                    warn!(provider = %spec, error = %e, "provider unavailable");
                    e.to_string()
                });
                (spec.as_str(), provider)
            })
            .collect();

        let base_params =
            CompletionParams::from_options(&config.options).with_timeout(self.timeout);

        let mut results = Vec::new();
        let mut stats = Stats::default();

        for (prompt_idx, (label, source)) in config.prompts.iter().zip(&sources).enumerate() {
            for (provider_spec, provider) in &providers {
                for (test_idx, test) in config.tests.iter().enumerate() {
                    let unit = Unit {
                        prompt_idx,
                        test_idx,
                        label,
                        source,
                        provider_spec,
                        test,
                    };
                    let result = self.run_unit(&unit, provider.as_ref(), &base_params);
                    stats.record(&result);
                    results.push(result);
                }
            }
        }

        debug!(
            eval_id = %eval_id,
            results = results.len(),
            errors = stats.errors,
            "evaluation finished"
        );

        Ok(EvalReport {
            eval_id,
            timestamp,
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
            results,
            stats,
        })
    }

    fn run_unit(
        &self,
        unit: &Unit<'_>,
        provider: std::result::Result<&Arc<dyn Provider>, &String>,
        base_params: &CompletionParams,
    ) -> EvalResult {
        let vars = unit.test.variables();
        let mut result = EvalResult {
            id: result_id(unit.label, unit.provider_spec, &vars),
            prompt_idx: unit.prompt_idx,
            test_idx: unit.test_idx,
            prompt: PromptInfo {
                raw: unit.source.to_string(),
                label: unit.label.to_string(),
            },
            provider: unit.provider_spec.to_string(),
            vars: Variables::new(),
            response: None,
            error: None,
            assertions: Vec::new(),
            success: false,
            latency_ms: 0.0,
        };

        let rendered = Template::new(unit.source, &vars)
            .with_base_dir(&self.base_dir)
            .with_max_depth(self.max_depth)
            .with_escape_marker(self.escape_marker.as_str())
            .process();
        result.vars = vars;

        let rendered = match rendered {
            Ok(rendered) => rendered,
            Err(e) => return self.errored(result, e.to_string()),
        };
        result.prompt.raw = rendered;

        if self.dry_run {
            result.success = true;
            return result;
        }

        let provider = match provider {
            Ok(provider) => provider,
            Err(message) => return self.errored(result, message.clone()),
        };

        let assertions = match unit.test.parse_assertions() {
            Ok(assertions) => assertions,
            Err(e) => return self.errored(result, e.to_string()),
        };

        let params = base_params.clone().with_vars(result.vars.clone());
        let started = Instant::now();
        let completion = provider.complete(&result.prompt.raw, &params);
        result.latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let completion = match completion {
            Ok(completion) => completion,
            Err(e) => return self.errored(result, e.to_string()),
        };

        debug!(
            provider = provider.id(),
            latency_ms = result.latency_ms,
            tokens = completion.usage.total,
            "completion received"
        );

        result.assertions = check_all(&completion.text, &assertions);
        result.success = all_passed(&result.assertions);
        result.response = Some(completion);
        result
    }

    fn errored(&self, mut result: EvalResult, message: String) -> EvalResult {
        warn!(
            prompt = result.prompt_idx,
            test = result.test_idx,
            provider = %result.provider,
            error = %message,
            "evaluation unit failed"
        );
        result.error = Some(message);
        result.success = false;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PeError;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const CAPITALS: &str = r#"
prompts:
  - "What is the capital of {{country}}?"
providers:
  - mock
tests:
  - vars: {country: France}
    assert:
      - type: contains
        value: Paris
  - vars: {country: Japan}
    assert:
      - type: contains
        value: Paris
"#;

    fn config(yaml: &str) -> TestConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_runs_every_combination() {
        let registry = ProviderRegistry::with_builtins();
        let mut config = config(CAPITALS);
        config.providers.push("echo".into());

        let report = Evaluator::new(&registry).run(&config).unwrap();
        assert_eq!(report.results.len(), 4);
        assert!(report.eval_id.starts_with("eval-"));

        let first = &report.results[0];
        assert_eq!(first.prompt.raw, "What is the capital of France?");
        assert_eq!(first.prompt.label, "What is the capital of {{country}}?");
        assert_eq!(first.output(), "The capital of France is Paris.");
        assert!(first.success);

        assert!(!report.results[1].success);
        assert_eq!(report.stats.successes, 1);
        assert_eq!(report.stats.failures, 3);
        assert_eq!(report.stats.errors, 0);
        assert!(report.stats.token_usage.total > 0);
        assert!(!report.all_passed());
    }

    #[test]
    fn test_template_error_is_isolated() {
        let registry = ProviderRegistry::with_builtins();
        let config = config(
            r#"
prompts: ["Hello {{name}}"]
providers: [echo]
tests:
  - vars: {}
    assert: [{type: contains, value: Hello}]
  - vars: {name: Ada}
    assert: [{type: equals, value: Hello Ada}]
"#,
        );

        let report = Evaluator::new(&registry).run(&config).unwrap();
        assert_eq!(
            report.results[0].error.as_deref(),
            Some("missing required variable: name")
        );
        assert!(report.results[1].success);
        assert_eq!(report.stats.errors, 1);
        assert_eq!(report.stats.successes, 1);
    }

    #[test]
    fn test_unknown_provider_is_recorded() {
        let registry = ProviderRegistry::with_builtins();
        let mut config = config(CAPITALS);
        config.providers = vec!["nope".into()];

        let report = Evaluator::new(&registry).run(&config).unwrap();
        assert!(report.results.iter().all(EvalResult::is_error));
        assert_eq!(
            report.results[0].error.as_deref(),
            Some("Provider not found: nope")
        );
    }

    #[test]
    fn test_provider_timeout_errors_the_unit() {
        let registry = ProviderRegistry::with_builtins();
        let config = config(
            r#"
prompts: ["Hello"]
providers: ["exec:sleep 5", echo]
tests:
  - vars: {}
    assert: [{type: equals, value: Hello}]
"#,
        );

        let report = Evaluator::new(&registry)
            .with_timeout(Duration::from_millis(100))
            .run(&config)
            .unwrap();
        let message = report.results[0].error.as_deref().unwrap_or_default();
        assert!(message.contains("timed out after 100ms"), "{message}");
        assert!(report.results[1].success);
        assert_eq!(report.stats.errors, 1);
    }

    #[test]
    fn test_dry_run_only_renders() {
        let registry = ProviderRegistry::with_builtins();
        let report = Evaluator::new(&registry)
            .dry_run(true)
            .run(&config(CAPITALS))
            .unwrap();

        assert!(report.results.iter().all(|r| r.response.is_none()));
        assert_eq!(report.results[1].prompt.raw, "What is the capital of Japan?");
        assert!(report.all_passed());
    }

    #[test]
    fn test_invalid_config_fails_the_run() {
        let registry = ProviderRegistry::with_builtins();
        let err = Evaluator::new(&registry)
            .run(&config("prompts: [p]\nproviders: [mock]"))
            .unwrap_err();
        assert!(matches!(err, PeError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_prompt_files_and_includes_use_base_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prompt.txt"), "{{file \"intro.txt\"}} {{name}}").unwrap();
        fs::write(dir.path().join("intro.txt"), "Hi").unwrap();

        let registry = ProviderRegistry::with_builtins();
        let config = config(
            "prompts: [\"file://prompt.txt\"]\nproviders: [echo]\ntests:\n  - vars: {name: Ada}\n    assert: [{type: equals, value: Hi Ada}]\n",
        );

        let report = Evaluator::new(&registry)
            .with_base_dir(dir.path())
            .run(&config)
            .unwrap();
        assert_eq!(report.results[0].prompt.label, "file://prompt.txt");
        assert!(report.results[0].success, "{:?}", report.results[0]);
    }

    #[test]
    fn test_result_ids_are_stable() {
        let vars: Variables = [("a".to_string(), json!(1))].into_iter().collect();
        let id = result_id("p", "mock", &vars);
        assert_eq!(id, result_id("p", "mock", &vars));
        assert_ne!(id, result_id("p", "echo", &vars));
        assert_eq!(id.len(), 17);
        assert!(id.starts_with('r'));
    }

    #[test]
    fn test_pass_rate() {
        let stats = Stats {
            successes: 3,
            failures: 1,
            ..Stats::default()
        };
        assert_eq!(stats.pass_rate(), 75.0);
        assert_eq!(Stats::default().pass_rate(), 0.0);
    }
}
