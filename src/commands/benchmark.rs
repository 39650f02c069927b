use std::path::Path;
use std::time::{Duration, Instant};

use console::style;
use miette::Result;

use pe::benchmark::{format_benchmark, Benchmark, BenchmarkFormat};
use pe::config::{config_dir, load_config, write_atomic};
use pe::template::{DEFAULT_ESCAPE_MARKER, DEFAULT_MAX_DEPTH};

pub fn run(
    config: Option<String>,
    iterations: usize,
    concurrency: usize,
    format: String,
    output: Option<String>,
    timeout: Duration,
) -> Result<()> {
    let path = super::require_config(config)?;
    let format: BenchmarkFormat = format.parse()?;
    let settings = super::settings()?;
    let test_config = load_config(&path)?;

    let registry = pe::build_registry(&settings);
    let benchmark = Benchmark::new(&registry)
        .with_base_dir(config_dir(&path))
        .with_iterations(iterations)
        .with_concurrency(concurrency)
        .with_timeout(timeout)
        .with_max_depth(settings.max_depth.unwrap_or(DEFAULT_MAX_DEPTH))
        .with_escape_marker(
            settings
                .escape_marker
                .as_deref()
                .unwrap_or(DEFAULT_ESCAPE_MARKER),
        );

    eprintln!(
        "{} Starting benchmark with {} prompts x {} providers x {} iterations...",
        style("==>").cyan().bold(),
        test_config.prompts.len(),
        test_config.providers.len(),
        iterations
    );
    let started = Instant::now();
    let report = benchmark.run(&test_config)?;
    eprintln!(
        "{} Benchmark completed in {:.2?}",
        style("✓").green().bold(),
        started.elapsed()
    );

    let text = format_benchmark(&report, format)?;
    match output {
        Some(output) => {
            write_atomic(Path::new(&output), &text)?;
            println!("Results written to {}", style(output).cyan());
        }
        None => print!("{text}"),
    }

    Ok(())
}
