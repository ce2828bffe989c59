//! Ignore patterns for template trees.
//! A `.kilnignore` file at the source root lists glob patterns, one per line,
//! matched against paths relative to `template/`. Matching entries, and
//! everything below matching directories, are left out of the render plan.

use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::debug;
use std::path::Path;

/// kiln's ignore file name.
pub const IGNORE_FILE: &str = ".kilnignore";

/// Patterns that are always ignored.
pub const DEFAULT_IGNORE_PATTERNS: [&str; 3] = ["**/.git", "**/.git/**", "**/.DS_Store"];

/// Reads the ignore file from `source_root` and compiles it together with the
/// default patterns. A missing file yields just the defaults.
///
/// # Errors
/// * `Error::IgnoreError` if a pattern is not a valid glob
/// * `Error::IoError` if the file exists but cannot be read
pub fn parse_ignore_file<P: AsRef<Path>>(source_root: P) -> Result<GlobSet> {
    let ignore_path = source_root.as_ref().join(IGNORE_FILE);
    let mut builder = GlobSetBuilder::new();

    for pattern in DEFAULT_IGNORE_PATTERNS {
        builder.add(compile(pattern)?);
    }

    if ignore_path.is_file() {
        let contents = std::fs::read_to_string(&ignore_path)?;
        for line in contents.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            builder.add(compile(line.trim_end_matches('/'))?);
        }
    } else {
        debug!("{IGNORE_FILE} does not exist");
    }

    builder
        .build()
        .map_err(|e| Error::IgnoreError(format!("{IGNORE_FILE} loading failed: {e}")))
}

fn compile(pattern: &str) -> Result<Glob> {
    Glob::new(pattern)
        .map_err(|e| Error::IgnoreError(format!("invalid pattern '{pattern}': {e}")))
}
