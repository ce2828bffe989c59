//! Template sources.
//! A source is either a local directory or a git repository cloned into the
//! template cache. Both expose the same layout: `template/`, `hooks/` and a
//! default values document at the root.
use crate::config::Options;
use crate::error::Result;
use crate::runner::RunOutcome;
use std::path::{Path, PathBuf};

pub mod git;
pub mod local;

pub use git::GitSource;
pub use local::LocalSource;

/// Subdirectory holding the tree to render.
pub const TEMPLATE_DIR: &str = "template";

/// Subdirectory holding post-generation hooks.
pub const HOOKS_DIR: &str = "hooks";

/// Prefix selecting a git source regardless of the URL scheme.
pub const GIT_PREFIX: &str = "git+";

/// Capabilities shared by every template source.
pub trait Source: std::fmt::Display {
    /// The location the template is materialized at.
    fn path(&self) -> &Path;

    fn absolute_path(&self) -> &Path;

    fn template_root(&self) -> PathBuf {
        self.absolute_path().join(TEMPLATE_DIR)
    }

    fn hooks_root(&self) -> PathBuf {
        self.absolute_path().join(HOOKS_DIR)
    }

    /// Checks the source before anything is fetched or written.
    fn validate(&self) -> Result<()>;

    /// Makes the template available under [`Source::path`].
    fn bootstrap(&mut self) -> Result<()>;

    /// Called once at the end of a run that got past bootstrapping.
    fn finalize(&mut self, outcome: &RunOutcome) -> Result<()>;
}

/// Creates the source matching a locator string.
///
/// `git+<url>` and recognizable git URLs select a [`GitSource`] cached under
/// `options.template_cache_dir`; anything else is a local path.
pub fn create_source(locator: &str, options: &Options) -> Result<Box<dyn Source>> {
    let url = match locator.strip_prefix(GIT_PREFIX) {
        Some(url) => url,
        None if git::is_git_url(locator) => locator,
        None => return Ok(Box::new(LocalSource::new(locator)?)),
    };
    let source = GitSource::new(url, &options.template_cache_dir, options.fetch_timeout)?;
    Ok(Box::new(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_source_display() {
        let options = Options::default();

        let local = create_source("/path/to/template", &options).unwrap();
        assert_eq!(format!("{}", local), "local path: '/path/to/template'");

        let git = create_source("git+https://example.com/user/repo.git", &options).unwrap();
        assert_eq!(
            format!("{}", git),
            "git repository: 'https://example.com/user/repo.git'"
        );

        let ssh = create_source("git@github.com:user/repo", &options).unwrap();
        assert_eq!(
            format!("{}", ssh),
            "git repository: 'git@github.com:user/repo'"
        );
    }

    #[test]
    fn test_layout_roots() {
        let source = LocalSource::new("/srv/scaffold").unwrap();
        assert_eq!(
            source.template_root(),
            PathBuf::from("/srv/scaffold/template")
        );
        assert_eq!(source.hooks_root(), PathBuf::from("/srv/scaffold/hooks"));
    }
}
