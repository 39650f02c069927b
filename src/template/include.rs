//! File inclusion: `{{file "path"}}` and `#include "path"`.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::escape::Escaper;
use super::lexer::{tokenize, TokenKind};
use crate::error::{PeError, Result};

pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Expands inclusion directives, recursively and with memoization.
///
/// The cache and depth counter live on the resolver, so one resolver should
/// serve a single render. Resolved contents are cached by their normalized
/// path; later references reuse the cached text even if the file changed on
/// disk in between.
#[derive(Debug)]
pub struct IncludeResolver {
    base_dir: PathBuf,
    max_depth: usize,
    depth: usize,
    cache: HashMap<PathBuf, String>,
    escaper: Option<Escaper>,
}

impl IncludeResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
            cache: HashMap::new(),
            escaper: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Hide escaped directives in every included file with `escaper`.
    ///
    /// The placeholders stay in the expanded text; take the escaper back with
    /// [`IncludeResolver::into_escaper`] to restore them.
    pub fn with_escaper(mut self, escaper: Escaper) -> Self {
        self.escaper = Some(escaper);
        self
    }

    pub fn into_escaper(self) -> Option<Escaper> {
        self.escaper
    }

    /// Shield text spliced in after hiding, such as variable values, from
    /// the escaper's restore step.
    pub fn protect(&mut self, text: String) -> String {
        match self.escaper.as_mut() {
            Some(escaper) => escaper.protect(&text),
            None => text,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Number of distinct files read so far.
    pub fn cached_files(&self) -> usize {
        self.cache.len()
    }

    /// Replace every inclusion directive in `text` with the resolved contents
    /// of the referenced file.
    pub fn process(&mut self, text: &str) -> Result<String> {
        let mut out = String::with_capacity(text.len());

        for token in tokenize(text) {
            let start = token.span.offset();
            let end = start + token.span.len();
            match token.kind {
                TokenKind::Include(path) => out.push_str(&self.include_file(&path)?),
                _ => out.push_str(&text[start..end]),
            }
        }

        Ok(out)
    }

    /// Read `path` and expand the inclusions it contains.
    pub fn include_file(&mut self, path: &str) -> Result<String> {
        if self.depth >= self.max_depth {
            return Err(PeError::MaxDepthExceeded {
                limit: self.max_depth,
            });
        }

        let resolved = self.resolve(path);
        if let Some(content) = self.cache.get(&resolved) {
            debug!(path = %resolved.display(), "include cache hit");
            return Ok(content.clone());
        }

        debug!(path = %resolved.display(), depth = self.depth, "reading include");
        let mut content = read_text(&resolved).map_err(|source| PeError::FileRead {
            path: path.to_string(),
            source,
        })?;
        if let Some(escaper) = self.escaper.as_mut() {
            content = escaper.hide(&content);
        }

        self.depth += 1;
        let expanded = self.process(&content);
        self.depth -= 1;
        let expanded = expanded?;

        self.cache.insert(resolved, expanded.clone());
        Ok(expanded)
    }

    /// Absolute paths are used as-is; relative ones are joined onto the base
    /// directory. `.` components are dropped so equivalent spellings share a
    /// cache entry.
    pub fn resolve(&self, path: &str) -> PathBuf {
        normalize(&resolve_against(&self.base_dir, path))
    }
}

fn resolve_against(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn read_text(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    if content_inspector::inspect(&bytes).is_binary() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "file looks like binary content",
        ));
    }
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Paths referenced by inclusion directives, in first-seen order without
/// duplicates.
pub fn extract_inclusions(text: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for token in tokenize(text) {
        if let TokenKind::Include(path) = token.kind {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

/// Referenced paths that do not exist relative to `base_dir`.
pub fn validate_inclusions(text: &str, base_dir: &Path) -> Vec<String> {
    extract_inclusions(text)
        .into_iter()
        .filter(|path| !resolve_against(base_dir, path).exists())
        .collect()
}
