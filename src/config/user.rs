use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PeError, Result};

/// User-level settings loaded from `~/.config/pe/config.toml`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Report format used when `--format` is not given.
    #[serde(default)]
    pub default_format: Option<String>,

    /// Limit for inclusion depth and conditional nesting.
    #[serde(default)]
    pub max_depth: Option<usize>,

    #[serde(default)]
    pub escape_marker: Option<String>,

    /// Provider aliases, e.g. `local = "exec:./scripts/llm.sh"`.
    #[serde(default)]
    pub providers: BTreeMap<String, String>,
}

fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pe").join("config.toml"))
}

/// Load user settings from the platform config directory.
///
/// Returns `Ok(None)` if there is no settings file.
pub fn load_settings() -> Result<Option<Settings>> {
    match settings_path() {
        Some(path) => load_settings_from(&path),
        None => Ok(None),
    }
}

pub fn load_settings_from(path: &Path) -> Result<Option<Settings>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| PeError::Io {
        context: format!("reading user settings {}", path.display()),
        source: e,
    })?;

    let settings = toml::from_str(&content).map_err(|e| PeError::SettingsParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(Some(settings))
}
