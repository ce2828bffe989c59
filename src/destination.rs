//! The directory a template is materialized into.

use crate::error::{Error, Result};
use log::{debug, warn};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

/// Local output directory. It must be missing or empty before a run starts.
#[derive(Debug)]
pub struct Destination {
    path: PathBuf,
    absolute_path: PathBuf,
    created: Cell<bool>,
}

impl Destination {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let absolute_path = std::path::absolute(&path)?;
        Ok(Self {
            path,
            absolute_path,
            created: Cell::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    /// Checks the destination without touching the filesystem.
    ///
    /// # Errors
    /// * `Error::DestinationNotEmptyError` if the path exists and has entries,
    ///   or exists and is not a directory
    pub fn check(&self) -> Result<()> {
        if !self.absolute_path.exists() {
            return Ok(());
        }
        if !self.absolute_path.is_dir() {
            return Err(Error::DestinationNotEmptyError {
                path: self.path.clone(),
            });
        }
        let mut entries = fs::read_dir(&self.absolute_path)?;
        if entries.next().is_some() {
            return Err(Error::DestinationNotEmptyError {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    /// Checks the destination and creates it, parents included, when missing.
    pub fn validate(&self) -> Result<()> {
        self.check()?;
        if !self.absolute_path.exists() {
            debug!("Creating destination '{}'.", self.absolute_path.display());
            fs::create_dir_all(&self.absolute_path).map_err(|source| Error::WriteError {
                path: self.absolute_path.clone(),
                source,
            })?;
            self.created.set(true);
        }
        Ok(())
    }

    /// Removes the directory again if [`Destination::validate`] created it and
    /// nothing has been written since.
    pub fn discard_if_created(&self) {
        if self.created.get() && fs::remove_dir(&self.absolute_path).is_ok() {
            debug!("Removed unused destination '{}'.", self.absolute_path.display());
            self.created.set(false);
        }
    }

    /// Removes the whole destination subtree.
    pub fn rollback(&self) -> std::io::Result<()> {
        if !self.absolute_path.exists() {
            return Ok(());
        }
        warn!("Rolling back destination '{}'.", self.absolute_path.display());
        fs::remove_dir_all(&self.absolute_path)
    }
}
