//! Canonical formatting and YAML/JSON conversion of config files.
//!
//! Files are handled as plain documents rather than [`TestConfig`]s so keys
//! this crate does not know about survive, in their original order.
//!
//! [`TestConfig`]: crate::config::TestConfig

use std::path::Path;

use serde_json::Value;
use similar::TextDiff;

use crate::config::{parse_document, read_file, serialize_document, write_atomic, Format};
use crate::error::{PeError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Formatted {
    pub original: String,
    pub formatted: String,
    pub format: Format,
}

impl Formatted {
    pub fn is_changed(&self) -> bool {
        self.original != self.formatted
    }

    /// Unified diff from the file on disk to its formatted form; empty when
    /// nothing changes.
    pub fn diff(&self, path: &Path) -> String {
        let shown = path.display();
        TextDiff::from_lines(&self.original, &self.formatted)
            .unified_diff()
            .context_radius(3)
            .header(&format!("a/{shown}"), &format!("b/{shown}"))
            .to_string()
    }
}

/// Format a file's contents. The output format defaults to the one implied
/// by the extension, then YAML.
pub fn format_file(path: &Path, output: Option<Format>) -> Result<Formatted> {
    let original = read_file(path)?;
    let input = Format::from_path(path);
    let document: Value = parse_document(&original, input, path)?;
    let format = output.or(input).unwrap_or(Format::Yaml);
    let formatted = serialize_document(&document, format)?;

    Ok(Formatted {
        original,
        formatted,
        format,
    })
}

/// Convert `input` to `output`. Without an explicit format, the output
/// file's extension decides.
pub fn convert_file(input: &Path, output: &Path, format: Option<Format>) -> Result<Format> {
    let format = match format.or_else(|| Format::from_path(output)) {
        Some(format) => format,
        None => {
            return Err(PeError::UnsupportedFormat {
                format: "cannot determine output format from extension".into(),
            })
        }
    };

    let content = read_file(input)?;
    let document: Value = parse_document(&content, Format::from_path(input), input)?;
    write_atomic(output, &serialize_document(&document, format)?)?;
    Ok(format)
}
