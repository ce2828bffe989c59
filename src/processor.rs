//! Render planning and commit.
//!
//! Rendering walks `template/` and produces an ordered list of [`RenderItem`]s
//! without touching the destination. Committing writes that list in order.
//! A dry run is a plan that is never committed.

use globset::GlobSet;
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};
use crate::renderer::TemplateRenderer;
use crate::values::TemplateContext;

/// Directory name reserved for kiln's own files inside a template tree.
/// It is never rendered.
pub const RESERVED_DIR: &str = ".kiln";

/// A fully resolved, not yet written piece of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderItem {
    /// Rendered parent directory (absolute, inside the destination).
    pub directory: PathBuf,
    /// Rendered entry name, marker extension stripped.
    pub name: String,
    pub is_directory: bool,
    /// Rendered or copied bytes; empty for directories.
    pub content: Vec<u8>,
    /// Reserved. Files are always written whole.
    pub append: bool,
}

impl RenderItem {
    /// Full path the item is written to.
    pub fn target(&self) -> PathBuf {
        self.directory.join(&self.name)
    }
}

/// Returns true when `file_name` carries the marker extension and has a stem.
pub fn is_template_file(file_name: &str, marker_ext: &str) -> bool {
    !marker_ext.is_empty() && file_name.len() > marker_ext.len() && file_name.ends_with(marker_ext)
}

/// Lexically resolves `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Returns true when `path` lies strictly below `root`.
pub fn is_contained<P: AsRef<Path>, R: AsRef<Path>>(path: P, root: R) -> bool {
    let path = normalize(path.as_ref());
    let root = normalize(root.as_ref());
    path != root && path.starts_with(&root)
}

/// Turns a template tree into render items.
pub struct Processor<'a> {
    engine: &'a dyn TemplateRenderer,
    context: &'a TemplateContext,
    marker_ext: &'a str,
    ignored_patterns: &'a GlobSet,
}

impl<'a> Processor<'a> {
    pub fn new(
        engine: &'a dyn TemplateRenderer,
        context: &'a TemplateContext,
        marker_ext: &'a str,
        ignored_patterns: &'a GlobSet,
    ) -> Self {
        Self {
            engine,
            context,
            marker_ext,
            ignored_patterns,
        }
    }

    fn interpolate(&self, template: &str, origin: &Path) -> Result<String> {
        let rendered = self
            .engine
            .render(template, self.context.binding())
            .map_err(|source| Error::TemplateSyntaxError {
                path: origin.to_path_buf(),
                source,
            })?;
        debug!("Interpolated '{template}' to '{rendered}'");
        Ok(rendered)
    }

    fn is_skipped(&self, template_root: &Path, entry: &DirEntry) -> bool {
        if entry.file_type().is_dir() && entry.file_name() == RESERVED_DIR {
            debug!("Skipping reserved directory {}", entry.path().display());
            return true;
        }
        match entry.path().strip_prefix(template_root) {
            Ok(relative) if self.ignored_patterns.is_match(relative) => {
                debug!("Skipping {} from ignore patterns", relative.display());
                true
            }
            _ => false,
        }
    }

    /// Walks `template_root` in file name order and plans the output under
    /// `destination_root`. Directories precede their contents.
    ///
    /// A rendered name may contain separators and `..`; the resulting path is
    /// resolved lexically, so the item always names its final location.
    ///
    /// # Errors
    /// * `Error::TemplateSyntaxError` if a name or template file fails to render
    /// * `Error::EmptyNameError` if a name renders to nothing
    /// * `Error::PathEscapeError` if a rendered path leaves `destination_root`
    /// * `Error::ReadError` if a source file cannot be read
    pub fn render(&self, template_root: &Path, destination_root: &Path) -> Result<Vec<RenderItem>> {
        debug!("Rendering template tree {}", template_root.display());
        let mut items = Vec::new();
        let mut rendered_dirs: HashMap<PathBuf, PathBuf> = HashMap::new();
        rendered_dirs.insert(template_root.to_path_buf(), destination_root.to_path_buf());

        let walker = WalkDir::new(template_root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_skipped(template_root, entry));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(template_root).to_path_buf();
                Error::ReadError {
                    path,
                    source: e.into(),
                }
            })?;
            let source = entry.path();
            let relative = source.strip_prefix(template_root).unwrap_or(source);

            let parent = source
                .parent()
                .and_then(|parent| rendered_dirs.get(parent))
                .cloned()
                .unwrap_or_else(|| destination_root.to_path_buf());

            let file_name = entry.file_name().to_str().ok_or_else(|| Error::ReadError {
                path: source.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, "name is not UTF-8"),
            })?;

            let is_directory = entry.file_type().is_dir();
            let is_template = !is_directory && is_template_file(file_name, self.marker_ext);

            let mut name = self.interpolate(file_name, relative)?;
            if is_template {
                if let Some(stripped) = name.strip_suffix(self.marker_ext) {
                    name = stripped.to_string();
                }
            }
            if name.is_empty() {
                return Err(Error::EmptyNameError {
                    path: relative.to_path_buf(),
                });
            }

            let target = normalize(&parent.join(&name));
            let escape_error = || Error::PathEscapeError {
                path: parent.join(&name),
                root: destination_root.to_path_buf(),
            };
            if !is_contained(&target, destination_root) {
                return Err(escape_error());
            }
            let (directory, name) = match (target.parent(), target.file_name()) {
                (Some(directory), Some(name)) => {
                    (directory.to_path_buf(), name.to_string_lossy().into_owned())
                }
                _ => return Err(escape_error()),
            };

            let content = if is_directory {
                rendered_dirs.insert(source.to_path_buf(), target.clone());
                Vec::new()
            } else {
                let raw = fs::read(source).map_err(|e| Error::ReadError {
                    path: source.to_path_buf(),
                    source: e,
                })?;
                if is_template {
                    let text = String::from_utf8(raw).map_err(|e| Error::ReadError {
                        path: source.to_path_buf(),
                        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                    })?;
                    self.interpolate(&text, relative)?.into_bytes()
                } else {
                    raw
                }
            };

            let kind = if is_directory { "directory" } else { "file" };
            debug!("Planned {kind}: '{}'", target.display());
            items.push(RenderItem {
                directory,
                name,
                is_directory,
                content,
                append: false,
            });
        }

        Ok(items)
    }
}

/// Writes render items in order: directories are created with their parents,
/// files are created or truncated and written whole.
///
/// # Errors
/// * `Error::WriteError` naming the first path that could not be written
pub fn commit(items: Vec<RenderItem>) -> Result<()> {
    for item in items {
        let target = item.target();
        let write_error = |source| Error::WriteError {
            path: target.clone(),
            source,
        };
        if item.is_directory {
            fs::create_dir_all(&target).map_err(write_error)?;
            debug!("Created directory: '{}'", target.display());
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(write_error)?;
            }
            fs::write(&target, &item.content).map_err(write_error)?;
            debug!("Wrote file: '{}'", target.display());
        }
    }
    Ok(())
}
