use std::time::Duration;

use clap::{Parser, Subcommand};
use pe::provider::parse_duration;

#[derive(Parser)]
#[command(
    name = "pe",
    about = "Prompt engineering toolkit: render templates, evaluate prompts, check outputs",
    version
)]
pub struct Cli {
    /// Show debug logs (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a test config: every prompt against every provider for every test
    Eval {
        /// Path to the test config
        config: Option<String>,

        /// Path to the test config (alternative to the positional argument)
        #[arg(short = 'c', long = "config", conflicts_with = "config")]
        config_flag: Option<String>,

        /// Write results to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Report format: json, yaml or text
        #[arg(short, long)]
        format: Option<String>,

        /// Render prompts without calling providers
        #[arg(long)]
        dry_run: bool,

        /// Limit for each provider call (e.g. 30s, 2m)
        #[arg(short, long, default_value = "30s", value_parser = parse_duration)]
        timeout: Duration,
    },

    /// Render a template file
    Render {
        /// Template file to render
        template: String,

        /// Set a variable (can be repeated: -d key=value)
        #[arg(short, long = "data", value_name = "KEY=VALUE")]
        data: Vec<String>,

        /// YAML or JSON file with variables
        #[arg(long)]
        vars: Option<String>,

        /// Directory for relative includes (default: the template's directory)
        #[arg(long)]
        base_dir: Option<String>,

        /// Report missing variables and files instead of rendering
        #[arg(long)]
        check: bool,
    },

    /// Validate config files
    Vet {
        /// Files or directories to check
        #[arg(default_value = ".")]
        paths: Vec<String>,

        /// Skip files matching a glob when walking directories
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Format config files
    Fmt {
        /// Files to format
        #[arg(required = true)]
        files: Vec<String>,

        /// Write the result back to the source file
        #[arg(short, long)]
        write: bool,

        /// Output format: yaml or json (default: the input format)
        #[arg(short, long)]
        output: Option<String>,

        /// Fail with a diff if a file is not formatted
        #[arg(long, conflicts_with = "write")]
        check: bool,
    },

    /// Convert a config between YAML and JSON
    Convert {
        input: String,
        output: String,

        /// Output format: yaml or json (default: from the output extension)
        #[arg(short = 'o', long = "output-format")]
        format: Option<String>,
    },

    /// Show a saved evaluation report
    View {
        /// Results file written by `pe eval -f json|yaml`
        file: String,
    },

    /// Measure latency and token usage of prompts and providers
    Benchmark {
        /// Path to the test config
        config: Option<String>,

        #[arg(short = 'c', long = "config", conflicts_with = "config")]
        config_flag: Option<String>,

        /// Number of runs per prompt and provider
        #[arg(short, long, default_value_t = 3)]
        iterations: usize,

        /// Number of concurrent runs
        #[arg(short = 'n', long, default_value_t = 1)]
        concurrency: usize,

        /// Output format: json, yaml, csv or text
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Write results to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Limit for each provider call (e.g. 30s, 2m)
        #[arg(short, long, default_value = "30s", value_parser = parse_duration)]
        timeout: Duration,
    },
}
