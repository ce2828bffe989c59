use crate::error::{Error, Result};
use crate::loader::Source;
use crate::runner::RunOutcome;
use std::path::{Path, PathBuf};

/// Template living in a local directory; used in place.
#[derive(Debug)]
pub struct LocalSource {
    path: PathBuf,
    absolute_path: PathBuf,
}

impl LocalSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let absolute_path = std::path::absolute(&path)?;
        Ok(Self {
            path,
            absolute_path,
        })
    }
}

impl std::fmt::Display for LocalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "local path: '{}'", self.path.display())
    }
}

impl Source for LocalSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    /// # Errors
    /// * `Error::NotADirectoryError` if the path is missing or not a directory
    fn validate(&self) -> Result<()> {
        if !self.absolute_path.is_dir() {
            return Err(Error::NotADirectoryError {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn bootstrap(&mut self) -> Result<()> {
        Ok(())
    }

    fn finalize(&mut self, _outcome: &RunOutcome) -> Result<()> {
        Ok(())
    }
}
