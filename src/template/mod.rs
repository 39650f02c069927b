//! Prompt templates: escapes, variables, file inclusion and conditionals.
//!
//! [`Template::process`] runs the whole pipeline:
//!
//! 1. escaped directives are hidden behind placeholders,
//! 2. inclusion directives are expanded (escapes in included files are
//!    hidden as they are read),
//! 3. the expanded text is parsed into an AST,
//! 4. the AST is evaluated: conditional branches are selected and variables
//!    substituted,
//! 5. hidden spans are restored with their escape marker stripped.

pub mod ast;
pub mod condition;
pub mod escape;
pub mod include;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod value;

use std::path::{Path, PathBuf};

use tracing::debug;

pub use condition::{evaluate, Condition};
pub use escape::{Escaper, DEFAULT_ESCAPE_MARKER};
pub use include::{extract_inclusions, validate_inclusions, IncludeResolver, DEFAULT_MAX_DEPTH};
pub use render::{extract_variables, missing_variables, substitute};
pub use value::{is_truthy, value_to_string, Variables};

use crate::error::Result;
use parser::parse;
use render::Renderer;

/// A template source bound to a variable set.
#[derive(Debug, Clone)]
pub struct Template<'a> {
    source: String,
    vars: &'a Variables,
    base_dir: PathBuf,
    max_depth: usize,
    escape_marker: String,
}

impl<'a> Template<'a> {
    pub fn new(source: impl Into<String>, vars: &'a Variables) -> Self {
        Self {
            source: source.into(),
            vars,
            base_dir: PathBuf::from("."),
            max_depth: DEFAULT_MAX_DEPTH,
            escape_marker: DEFAULT_ESCAPE_MARKER.to_string(),
        }
    }

    /// Directory that relative inclusion paths are resolved against.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Limit for both inclusion depth and conditional nesting.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_escape_marker(mut self, marker: impl Into<String>) -> Self {
        self.escape_marker = marker.into();
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Render the template. Each call starts from an empty inclusion cache.
    pub fn process(&self) -> Result<String> {
        let mut escaper = Escaper::new(self.escape_marker.as_str());
        let hidden = escaper.hide(&self.source);

        let mut resolver = IncludeResolver::new(&self.base_dir)
            .with_max_depth(self.max_depth)
            .with_escaper(escaper);
        let expanded = resolver.process(&hidden)?;
        debug!(
            files = resolver.cached_files(),
            bytes = expanded.len(),
            "expanded inclusions"
        );

        let document = parse(&expanded, self.max_depth)?;
        let rendered = Renderer::new(self.vars, &mut resolver, self.max_depth).render(&document)?;

        let escaper = resolver.into_escaper().unwrap_or_default();
        Ok(escaper.restore(&rendered))
    }

    /// Problems that would make [`Template::process`] fail, without reading
    /// included files: `missing variable: <name>` entries followed by
    /// `missing file: <path>` entries.
    pub fn validate(&self) -> Vec<String> {
        let mut escaper = Escaper::new(self.escape_marker.as_str());
        let hidden = escaper.hide(&self.source);

        let variables = missing_variables(&hidden, self.vars)
            .into_iter()
            .map(|name| format!("missing variable: {name}"));
        let files = validate_inclusions(&hidden, &self.base_dir)
            .into_iter()
            .map(|path| format!("missing file: {path}"));

        variables.chain(files).collect()
    }
}

/// Render `source` with `vars`, resolving inclusions against the current
/// directory.
pub fn render(source: &str, vars: &Variables) -> Result<String> {
    Template::new(source, vars).process()
}

/// Render several sources with the same variables, stopping at the first
/// failure.
pub fn render_many<S: AsRef<str>>(sources: &[S], vars: &Variables) -> Result<Vec<String>> {
    sources
        .iter()
        .map(|source| render(source.as_ref(), vars))
        .collect()
}
