//! Repeated prompt runs with latency and token statistics.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{resolve_prompt, serialize_document, Format, TestConfig};
use crate::error::{PeError, Result};
use crate::provider::{CompletionParams, Provider, ProviderRegistry};
use crate::template::{Template, Variables, DEFAULT_ESCAPE_MARKER, DEFAULT_MAX_DEPTH};

/// Above this many workers a warning is logged; remote back-ends behind
/// `exec` tend to rate-limit.
pub const HIGH_CONCURRENCY: usize = 10;

pub const DEFAULT_ITERATIONS: usize = 3;

const MAX_PROMPT_DISPLAY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    pub prompt: String,
    pub provider: String,
    pub iteration: usize,
    pub latency_ms: f64,
    pub tokens_total: u64,
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkSummary {
    pub prompt: String,
    pub provider: String,
    pub runs: usize,
    pub errors: usize,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p90_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub avg_tokens_total: f64,
    pub avg_tokens_input: f64,
    pub avg_tokens_output: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    pub timestamp: String,
    pub duration_ms: f64,
    pub results: Vec<BenchmarkResult>,
    pub summaries: Vec<BenchmarkSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchmarkFormat {
    Json,
    Yaml,
    Csv,
    Text,
}

impl FromStr for BenchmarkFormat {
    type Err = PeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(BenchmarkFormat::Json),
            "yaml" | "yml" => Ok(BenchmarkFormat::Yaml),
            "csv" => Ok(BenchmarkFormat::Csv),
            "text" | "txt" => Ok(BenchmarkFormat::Text),
            _ => Err(PeError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// Value at percentile `p` (0-100) of sorted data, interpolating linearly
/// between the two nearest ranks.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted {
        [] => 0.0,
        [only] => *only,
        _ => {
            let position = (p / 100.0) * (sorted.len() - 1) as f64;
            let lower = position.floor() as usize;
            let fraction = position - lower as f64;
            if fraction == 0.0 || lower + 1 >= sorted.len() {
                return sorted[lower.min(sorted.len() - 1)];
            }
            sorted[lower] + (sorted[lower + 1] - sorted[lower]) * fraction
        }
    }
}

/// Summaries per (prompt, provider), in first-seen order.
pub fn summarize(results: &[BenchmarkResult]) -> Vec<BenchmarkSummary> {
    let mut groups: Vec<((&str, &str), Vec<&BenchmarkResult>)> = Vec::new();
    for result in results {
        let key = (result.prompt.as_str(), result.provider.as_str());
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, group)) => group.push(result),
            None => groups.push((key, vec![result])),
        }
    }

    groups
        .into_iter()
        .map(|((prompt, provider), group)| {
            let count = group.len() as f64;
            let mut latencies: Vec<f64> = group.iter().map(|r| r.latency_ms).collect();
            latencies.sort_by(f64::total_cmp);

            let avg = |f: fn(&BenchmarkResult) -> f64| group.iter().map(|r| f(r)).sum::<f64>() / count;

            BenchmarkSummary {
                prompt: prompt.to_string(),
                provider: provider.to_string(),
                runs: group.len(),
                errors: group.iter().filter(|r| r.error.is_some()).count(),
                avg_latency_ms: avg(|r| r.latency_ms),
                min_latency_ms: latencies.first().copied().unwrap_or_default(),
                max_latency_ms: latencies.last().copied().unwrap_or_default(),
                p50_latency_ms: percentile(&latencies, 50.0),
                p90_latency_ms: percentile(&latencies, 90.0),
                p95_latency_ms: percentile(&latencies, 95.0),
                p99_latency_ms: percentile(&latencies, 99.0),
                avg_tokens_total: avg(|r| r.tokens_total as f64),
                avg_tokens_input: avg(|r| r.tokens_input as f64),
                avg_tokens_output: avg(|r| r.tokens_output as f64),
                total_cost: group.iter().map(|r| r.cost).sum(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Job {
    prompt_idx: usize,
    provider_idx: usize,
    iteration: usize,
}

#[derive(Debug)]
pub struct Benchmark<'r> {
    registry: &'r ProviderRegistry,
    base_dir: PathBuf,
    iterations: usize,
    concurrency: usize,
    max_depth: usize,
    escape_marker: String,
    timeout: Option<Duration>,
}

impl<'r> Benchmark<'r> {
    pub fn new(registry: &'r ProviderRegistry) -> Self {
        Self {
            registry,
            base_dir: PathBuf::from("."),
            iterations: DEFAULT_ITERATIONS,
            concurrency: 1,
            max_depth: DEFAULT_MAX_DEPTH,
            escape_marker: DEFAULT_ESCAPE_MARKER.to_string(),
            timeout: None,
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Number of worker threads; values below 1 are treated as 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
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

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Vars from the first test case, plus `provider`.
    fn vars_for(config: &TestConfig, provider: &str) -> Variables {
        let mut vars = config
            .tests
            .first()
            .map(|t| t.variables())
            .unwrap_or_default();
        vars.insert("provider".to_string(), Value::String(provider.to_string()));
        vars
    }

    pub fn run(&self, config: &TestConfig) -> Result<BenchmarkReport> {
        if config.prompts.is_empty() {
            return Err(PeError::ConfigInvalid {
                message: "no prompts specified".into(),
            });
        }
        if config.providers.is_empty() {
            return Err(PeError::ConfigInvalid {
                message: "no providers specified".into(),
            });
        }
        if self.concurrency > HIGH_CONCURRENCY {
            warn!(
                concurrency = self.concurrency,
                "high concurrency might trigger provider rate limits"
            );
        }

        let sources = config
            .prompts
            .iter()
            .map(|p| resolve_prompt(p, &self.base_dir))
            .collect::<Result<Vec<_>>>()?;
        let providers: Vec<std::result::Result<Arc<dyn Provider>, String>> = config
            .providers
            .iter()
            .map(|spec| self.registry.get(spec).map_err(|e| e.to_string()))
            .collect();
        let base_params =
            CompletionParams::from_options(&config.options).with_timeout(self.timeout);

        let mut jobs = Vec::new();
        for prompt_idx in 0..sources.len() {
            for provider_idx in 0..providers.len() {
                for iteration in 1..=self.iterations {
                    jobs.push(Job {
                        prompt_idx,
                        provider_idx,
                        iteration,
                    });
                }
            }
        }

        let started = Instant::now();
        let workers = self.concurrency.min(jobs.len()).max(1);
        debug!(jobs = jobs.len(), workers, "starting benchmark");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|source| PeError::ThreadPool { source })?;

        let results: Vec<BenchmarkResult> = pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let spec = &config.providers[job.provider_idx];
                    let vars = Self::vars_for(config, spec);
                    self.run_job(
                        job,
                        &config.prompts[job.prompt_idx],
                        &sources[job.prompt_idx],
                        spec,
                        providers[job.provider_idx].as_ref(),
                        base_params.clone().with_vars(vars),
                    )
                })
                .collect()
        });

        Ok(BenchmarkReport {
            timestamp: chrono::Local::now().to_rfc3339(),
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
            summaries: summarize(&results),
            results,
        })
    }

    fn run_job(
        &self,
        job: &Job,
        label: &str,
        source: &str,
        spec: &str,
        provider: std::result::Result<&Arc<dyn Provider>, &String>,
        params: CompletionParams,
    ) -> BenchmarkResult {
        let mut result = BenchmarkResult {
            prompt: label.to_string(),
            provider: spec.to_string(),
            iteration: job.iteration,
            latency_ms: 0.0,
            tokens_total: 0,
            tokens_input: 0,
            tokens_output: 0,
            cost: 0.0,
            error: None,
        };

        let outcome = Template::new(source, &params.vars)
            .with_base_dir(&self.base_dir)
            .with_max_depth(self.max_depth)
            .with_escape_marker(self.escape_marker.as_str())
            .process()
            .map_err(|e| e.to_string())
            .and_then(|prompt| {
                let provider = provider.map_err(String::clone)?;
                let started = Instant::now();
                let completion = provider.complete(&prompt, &params);
                result.latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                completion.map_err(|e| e.to_string())
            });

        match outcome {
            Ok(completion) => {
                result.tokens_total = completion.usage.total;
                result.tokens_input = completion.usage.prompt;
                result.tokens_output = completion.usage.completion;
            }
            Err(message) => {
                warn!(
                    prompt = job.prompt_idx + 1,
                    provider = spec,
                    iteration = job.iteration,
                    error = %message,
                    "benchmark run failed"
                );
                result.error = Some(message);
            }
        }
        result
    }
}

pub fn format_benchmark(report: &BenchmarkReport, format: BenchmarkFormat) -> Result<String> {
    match format {
        BenchmarkFormat::Json => serialize_document(report, Format::Json),
        BenchmarkFormat::Yaml => serialize_document(report, Format::Yaml),
        BenchmarkFormat::Csv => format_csv(&report.summaries),
        BenchmarkFormat::Text => Ok(format_text(&report.summaries)),
    }
}

pub const CSV_HEADER: [&str; 13] = [
    "Prompt",
    "Provider",
    "AvgLatencyMs",
    "MinLatencyMs",
    "MaxLatencyMs",
    "P50LatencyMs",
    "P90LatencyMs",
    "P95LatencyMs",
    "P99LatencyMs",
    "AvgTokensTotal",
    "AvgTokensInput",
    "AvgTokensOutput",
    "TotalCost",
];

fn format_csv(summaries: &[BenchmarkSummary]) -> Result<String> {
    let csv_err = |e: csv::Error| PeError::Serialize {
        what: "CSV".into(),
        reason: e.to_string(),
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(csv_err)?;
    for s in summaries {
        writer
            .write_record([
                s.prompt.clone(),
                s.provider.clone(),
                format!("{:.2}", s.avg_latency_ms),
                format!("{:.2}", s.min_latency_ms),
                format!("{:.2}", s.max_latency_ms),
                format!("{:.2}", s.p50_latency_ms),
                format!("{:.2}", s.p90_latency_ms),
                format!("{:.2}", s.p95_latency_ms),
                format!("{:.2}", s.p99_latency_ms),
                format!("{:.2}", s.avg_tokens_total),
                format!("{:.2}", s.avg_tokens_input),
                format!("{:.2}", s.avg_tokens_output),
                format!("{:.6}", s.total_cost),
            ])
            .map_err(csv_err)?;
    }

    let bytes = writer.into_inner().map_err(|e| PeError::Serialize {
        what: "CSV".into(),
        reason: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| PeError::Serialize {
        what: "CSV".into(),
        reason: e.to_string(),
    })
}

fn display_prompt(prompt: &str) -> String {
    if prompt.chars().count() > MAX_PROMPT_DISPLAY {
        let cut: String = prompt.chars().take(MAX_PROMPT_DISPLAY - 3).collect();
        format!("{cut}...")
    } else {
        prompt.to_string()
    }
}

fn format_text(summaries: &[BenchmarkSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Benchmark Results Summary");
    let _ = writeln!(out, "========================");
    let _ = writeln!(out);

    let mut prompts: Vec<&str> = Vec::new();
    for s in summaries {
        if !prompts.contains(&s.prompt.as_str()) {
            prompts.push(&s.prompt);
        }
    }

    let rule = "-".repeat(60);
    for prompt in prompts {
        let mut group: Vec<&BenchmarkSummary> =
            summaries.iter().filter(|s| s.prompt == prompt).collect();
        group.sort_by(|a, b| a.provider.cmp(&b.provider));

        let _ = writeln!(out, "Prompt: {}", display_prompt(prompt));
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "{:<20} {:<11} {:<10} {:<10} {:<10} {:<10}",
            "Provider", "Avg Latency", "Min", "Max", "Tokens", "Cost"
        );
        let _ = writeln!(out, "{rule}");
        for s in group {
            let _ = writeln!(
                out,
                "{:<20} {:<11.2} {:<10.2} {:<10.2} {:<10.2} ${:<9.6}",
                s.provider,
                s.avg_latency_ms,
                s.min_latency_ms,
                s.max_latency_ms,
                s.avg_tokens_total,
                s.total_cost
            );
        }
        let _ = writeln!(out);
    }
    out
}
