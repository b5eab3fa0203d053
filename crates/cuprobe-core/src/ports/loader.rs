//! Library loader port.
//!
//! Discovery decides which file to bind; the loader is the opaque step that
//! accepts or rejects it.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
#[error("cannot load {path}: {reason}")]
pub struct LoadError {
    pub path: PathBuf,
    pub reason: String,
}

impl LoadError {
    pub fn new(path: &Path, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Port for validating that a shared library can be bound.
#[cfg_attr(test, mockall::automock)]
pub trait LibraryLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<(), LoadError>;
}
