pub mod benchmark;
pub mod convert;
pub mod eval;
pub mod fmt;
pub mod render;
pub mod vet;
pub mod view;

use std::path::PathBuf;

use console::style;
use miette::Result;

use pe::config::{load_settings, Format, Settings};

/// User settings, or defaults when there is no settings file.
pub fn settings() -> Result<Settings> {
    Ok(load_settings()?.unwrap_or_default())
}

pub fn require_config(config: Option<String>) -> Result<PathBuf> {
    config
        .map(PathBuf::from)
        .ok_or_else(|| miette::miette!("no configuration file provided"))
}

pub fn parse_format(format: Option<&str>) -> Result<Option<Format>> {
    Ok(format.map(str::parse).transpose()?)
}

pub fn warn(message: impl std::fmt::Display) {
    eprintln!(
        "{} {}",
        style("warning:").yellow().bold(),
        style(message).yellow()
    );
}
