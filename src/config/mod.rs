pub mod schema;
pub mod user;

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{PeError, Result};

pub use schema::{TestCase, TestConfig};
pub use user::{load_settings, Settings};

/// Prefix marking a prompt that is read from a file.
pub const FILE_PROMPT_PREFIX: &str = "file://";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Format implied by a file extension, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Format::Yaml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Yaml => "yaml",
            Format::Json => "json",
        }
    }
}

impl FromStr for Format {
    type Err = PeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            _ => Err(PeError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Parse `content` as `T`. Without a format hint YAML is tried first, then
/// JSON.
pub fn parse_document<T: DeserializeOwned>(
    content: &str,
    format: Option<Format>,
    path: &Path,
) -> Result<T> {
    match format {
        Some(Format::Yaml) => serde_yaml::from_str(content).map_err(|e| PeError::ConfigParseYaml {
            path: path.to_path_buf(),
            source: e,
        }),
        Some(Format::Json) => serde_json::from_str(content).map_err(|e| PeError::ConfigParseJson {
            path: path.to_path_buf(),
            source: e,
        }),
        None => serde_yaml::from_str(content).or_else(|yaml_err| {
            serde_json::from_str(content).map_err(|json_err| PeError::ConfigParse {
                path: path.to_path_buf(),
                reason: format!("YAML: {yaml_err}; JSON: {json_err}"),
            })
        }),
    }
}

pub fn serialize_document<T: Serialize>(value: &T, format: Format) -> Result<String> {
    match format {
        Format::Yaml => serde_yaml::to_string(value).map_err(|e| PeError::Serialize {
            what: "YAML".into(),
            reason: e.to_string(),
        }),
        Format::Json => serde_json::to_string_pretty(value)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| PeError::Serialize {
                what: "JSON".into(),
                reason: e.to_string(),
            }),
    }
}

pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| PeError::Io {
        context: format!("reading {}", path.display()),
        source: e,
    })
}

/// Load a test config, choosing the parser from the file extension.
pub fn load_config(path: &Path) -> Result<TestConfig> {
    let content = read_file(path)?;
    let config = parse_document(&content, Format::from_path(path), path)?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Write a config as YAML or pretty JSON. Without a format, the extension
/// decides, defaulting to YAML.
pub fn save_config(config: &TestConfig, path: &Path, format: Option<Format>) -> Result<()> {
    let format = format
        .or_else(|| Format::from_path(path))
        .unwrap_or(Format::Yaml);
    write_atomic(path, &serialize_document(config, format)?)
}

/// Replace `path` with `content` through a temp file in the same directory.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let io_err = |e: std::io::Error| PeError::Io {
        context: format!("writing {}", path.display()),
        source: e,
    };

    let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
    file.write_all(content.as_bytes()).map_err(io_err)?;
    file.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// The text of a prompt entry: inline text, or the contents of a
/// `file://` reference resolved against `base_dir`.
pub fn resolve_prompt(prompt: &str, base_dir: &Path) -> Result<String> {
    match prompt.strip_prefix(FILE_PROMPT_PREFIX) {
        Some(file) => {
            let path = Path::new(file);
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                base_dir.join(path)
            };
            read_file(&path)
        }
        None => Ok(prompt.to_string()),
    }
}

/// Directory a config's relative paths are resolved against.
pub fn config_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    const YAML: &str = "prompts: [\"Hi {{name}}\"]\nproviders: [echo]\ntests:\n  - vars: {name: Ada}\n    assert:\n      - type: contains\n        value: Ada\n";

    #[rstest]
    #[case("a.yaml", Some(Format::Yaml))]
    #[case("a.YML", Some(Format::Yaml))]
    #[case("a.json", Some(Format::Json))]
    #[case("a.txt", None)]
    #[case("noext", None)]
    fn test_format_from_path(#[case] path: &str, #[case] expected: Option<Format>) {
        assert_eq!(Format::from_path(Path::new(path)), expected);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("YAML".parse::<Format>().unwrap(), Format::Yaml);
        assert!("toml".parse::<Format>().is_err());
    }

    #[test]
    fn test_load_without_extension_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, r#"{"prompts": ["p"], "providers": ["mock"], "tests": []}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.prompts, vec!["p"]);
    }

    #[test]
    fn test_load_reports_parse_error_with_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, PeError::ConfigParseJson { .. }));
    }

    #[test]
    fn test_save_and_reload_in_both_formats() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("config.yaml");
        fs::write(&src, YAML).unwrap();
        let config = load_config(&src).unwrap();

        let json_path = dir.path().join("out.json");
        save_config(&config, &json_path, None).unwrap();
        let written = fs::read_to_string(&json_path).unwrap();
        assert!(written.starts_with("{\n  \"prompts\""));
        assert_eq!(load_config(&json_path).unwrap(), config);

        let yaml_path = dir.path().join("out.txt");
        save_config(&config, &yaml_path, Some(Format::Yaml)).unwrap();
        let reloaded: TestConfig =
            parse_document(&fs::read_to_string(&yaml_path).unwrap(), Some(Format::Yaml), &yaml_path)
                .unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_resolve_prompt() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("p.txt"), "from file").unwrap();

        assert_eq!(resolve_prompt("inline", dir.path()).unwrap(), "inline");
        assert_eq!(resolve_prompt("file://p.txt", dir.path()).unwrap(), "from file");
        assert!(resolve_prompt("file://missing.txt", dir.path()).is_err());
    }
}
