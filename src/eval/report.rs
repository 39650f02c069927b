use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

use super::EvalReport;
use crate::config::{parse_document, read_file, serialize_document, write_atomic, Format};
use crate::error::{PeError, Result};

const MAX_OUTPUT_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Yaml,
    Text,
}

impl FromStr for ReportFormat {
    type Err = PeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "yaml" | "yml" => Ok(ReportFormat::Yaml),
            "text" | "txt" => Ok(ReportFormat::Text),
            _ => Err(PeError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

pub fn format_report(report: &EvalReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => serialize_document(report, Format::Json),
        ReportFormat::Yaml => serialize_document(report, Format::Yaml),
        ReportFormat::Text => Ok(format_text(report)),
    }
}

/// Write a report to `path`, or return it for printing when there is no
/// path.
pub fn write_report(
    report: &EvalReport,
    path: Option<&Path>,
    format: ReportFormat,
) -> Result<Option<String>> {
    let text = format_report(report, format)?;
    match path {
        Some(path) => {
            write_atomic(path, &text)?;
            Ok(None)
        }
        None => Ok(Some(text)),
    }
}

/// Load a report previously written as JSON or YAML.
pub fn read_report(path: &Path) -> Result<EvalReport> {
    let content = read_file(path)?;
    parse_document(&content, Format::from_path(path), path)
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub fn format_text(report: &EvalReport) -> String {
    let stats = &report.stats;
    let mut out = String::new();

    let _ = writeln!(out, "Test Results Summary (ID: {})", report.eval_id);
    let _ = writeln!(out, "=====================");
    let _ = writeln!(out, "Pass Rate: {:.1}%", stats.pass_rate());
    let _ = writeln!(out, "Passed Tests: {}", stats.successes);
    let _ = writeln!(out, "Failed Tests: {}", stats.failures);
    if stats.errors > 0 {
        let _ = writeln!(out, "Errored Tests: {}", stats.errors);
    }
    let _ = writeln!(out, "Total Tests: {}", stats.total());
    let _ = writeln!(out, "Duration: {:.2}s", report.duration_ms / 1000.0);
    let _ = writeln!(out);

    let _ = writeln!(out, "Test Results");
    let _ = writeln!(out, "------------");
    for (i, result) in report.results.iter().enumerate() {
        let status = match (&result.error, result.success) {
            (Some(_), _) => "ERROR",
            (None, true) => "PASS",
            (None, false) => "FAIL",
        };
        let _ = writeln!(out, "{}. [{status}] Provider: {}", i + 1, result.provider);
        let _ = writeln!(out, "   Prompt: {}", result.prompt.raw);
        match &result.error {
            Some(error) => {
                let _ = writeln!(out, "   Error: {error}");
            }
            None => {
                let _ = writeln!(
                    out,
                    "   Output: {}",
                    truncate(result.output(), MAX_OUTPUT_CHARS)
                );
            }
        }
        for failed in result.assertions.iter().filter(|a| !a.success) {
            let _ = writeln!(out, "   - {}: {}", failed.assertion.kind, failed.reason);
        }
        let _ = writeln!(out);
    }

    out
}
