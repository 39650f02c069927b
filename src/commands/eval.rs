use std::path::Path;
use std::time::Duration;

use console::style;
use miette::Result;

use pe::config::{config_dir, load_config};
use pe::eval::{write_report, Evaluator, ReportFormat};
use pe::template::{DEFAULT_ESCAPE_MARKER, DEFAULT_MAX_DEPTH};

pub fn run(
    config: Option<String>,
    output: Option<String>,
    format: Option<String>,
    dry_run: bool,
    timeout: Duration,
) -> Result<()> {
    let path = super::require_config(config)?;
    let settings = super::settings()?;

    let format: ReportFormat = format
        .or_else(|| settings.default_format.clone())
        .as_deref()
        .unwrap_or("json")
        .parse()?;

    let test_config = load_config(&path)?;
    let registry = pe::build_registry(&settings);
    let report = Evaluator::new(&registry)
        .with_base_dir(config_dir(&path))
        .with_max_depth(settings.max_depth.unwrap_or(DEFAULT_MAX_DEPTH))
        .with_escape_marker(
            settings
                .escape_marker
                .as_deref()
                .unwrap_or(DEFAULT_ESCAPE_MARKER),
        )
        .with_timeout(timeout)
        .dry_run(dry_run)
        .run(&test_config)?;

    match write_report(&report, output.as_deref().map(Path::new), format)? {
        Some(text) => print!("{text}"),
        None => println!(
            "{} Results written to {}",
            style("✓").green().bold(),
            style(output.as_deref().unwrap_or_default()).cyan()
        ),
    }

    let stats = &report.stats;
    if !report.all_passed() {
        eprintln!(
            "{} {} passed, {} failed, {} errored",
            style("✗").red().bold(),
            stats.successes,
            stats.failures,
            stats.errors
        );
        std::process::exit(1);
    }

    Ok(())
}
