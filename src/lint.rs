//! Config file discovery and validation for `pe vet`.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::{load_config, Format, TestConfig};
use crate::error::{PeError, Result};

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| PeError::GlobPattern {
            pattern: pattern.clone(),
            source: e,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| PeError::GlobPattern {
        pattern: "<combined>".into(),
        source: e,
    })
}

/// Expand `paths` into config files. Files are taken as given; directories
/// are walked for `.yaml`, `.yml` and `.json` files, skipping paths (relative
/// to the directory) that match an `exclude` glob.
pub fn collect_config_files(paths: &[PathBuf], exclude: &[String]) -> Result<Vec<PathBuf>> {
    let exclude_set = build_glob_set(exclude)?;
    let mut files = Vec::new();

    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| Format::from_path(e.path()).is_some())
            .filter(|e| {
                let rel = e.path().strip_prefix(path).unwrap_or(e.path());
                !exclude_set.is_match(rel)
            })
            .map(|e| e.into_path())
            .collect();
        found.sort();
        debug!(dir = %path.display(), files = found.len(), "collected config files");
        files.extend(found);
    }

    Ok(files)
}

/// Load and validate one config file.
pub fn vet_file(path: &Path) -> Result<TestConfig> {
    let config = load_config(path)?;
    config.validate()?;
    Ok(config)
}
