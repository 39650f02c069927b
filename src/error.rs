#![allow(unused_assignments)]

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PeError {
    #[error("missing required variable: {name}")]
    #[diagnostic(help("Add '{name}' to the test case's vars, or escape the placeholder as \\{{{{{name}}}}}"))]
    MissingVariable { name: String },

    #[error("error reading included file: {path}")]
    #[diagnostic(help("Relative include paths are resolved against the template's base directory"))]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("maximum inclusion depth reached ({limit})")]
    #[diagnostic(help("Check for files that include each other in a cycle"))]
    MaxDepthExceeded { limit: usize },

    #[error("maximum conditional nesting depth reached ({limit})")]
    #[diagnostic(help("Check that every #if has a matching #endif"))]
    MaxNestingExceeded { limit: usize },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config {path}")]
    #[diagnostic(help("Check the YAML syntax of the configuration file"))]
    ConfigParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse JSON config {path}")]
    #[diagnostic(help("Check the JSON syntax of the configuration file"))]
    ConfigParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse config {path} (tried YAML and JSON)")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("Invalid config: {message}")]
    #[diagnostic(help("A config needs non-empty 'prompts', 'providers' and 'tests' lists"))]
    ConfigInvalid { message: String },

    #[error("Failed to serialize {what}: {reason}")]
    Serialize { what: String, reason: String },

    #[error("Failed to parse user settings {path}")]
    #[diagnostic(help("Check the TOML syntax in your pe config.toml"))]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("assertion missing '{field}' field")]
    AssertionMissingField { field: &'static str },

    #[error("assertion {index} is not a map")]
    AssertionNotMap { index: usize },

    #[error("invalid assertion {index}: missing '{field}' field")]
    #[diagnostic(help("Every assertion needs a 'type' and a 'value'"))]
    AssertionField { index: usize, field: &'static str },

    #[error("Unsupported format: {format}")]
    #[diagnostic(help("Supported formats: yaml, json (and csv, text for reports)"))]
    UnsupportedFormat { format: String },

    #[error("Provider not found: {name}")]
    #[diagnostic(help("Built-in providers: echo, mock, exec:<command>"))]
    ProviderNotFound { name: String },

    #[error("invalid duration '{value}'")]
    #[diagnostic(help("Use a number with a unit: ms, s, m or h (e.g. 30s, 1m30s)"))]
    InvalidDuration { value: String },

    #[error("Provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    #[error("Failed to start benchmark workers")]
    ThreadPool {
        #[source]
        source: rayon::ThreadPoolBuildError,
    },

    #[error("Glob pattern error: {pattern}")]
    GlobPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

pub type Result<T> = std::result::Result<T, PeError>;
