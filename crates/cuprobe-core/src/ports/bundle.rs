//! Bundle fetch port.
//!
//! A bundle is a self-contained directory tree for one artifact at one
//! release. How it gets onto disk (cache, download, unpack) is the
//! fetcher's business; fetching the same artifact twice must be cheap and
//! return the same directory.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::version::Version;

/// Name of the toolkit artifact.
pub const TOOLKIT_ARTIFACT: &str = "cuda";

/// Identity of a fetchable bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId {
    pub name: String,
    pub release: Version,
}

impl ArtifactId {
    pub fn new(name: impl Into<String>, release: Version) -> Self {
        Self {
            name: name.into(),
            release: release.release(),
        }
    }

    pub fn toolkit(release: Version) -> Self {
        Self::new(TOOLKIT_ARTIFACT, release)
    }

    /// Directory / archive stem: `cuda-12.4`.
    pub fn slug(&self) -> String {
        format!("{}-{}", self.name, self.release.release_string())
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug())
    }
}

/// Why a bundle could not be provided. Always non-fatal to resolution as a
/// whole: the caller moves on to the next candidate.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// No bundle exists for this artifact/release on this platform.
    #[error("no bundle available for {artifact}: {reason}")]
    Unavailable { artifact: ArtifactId, reason: String },

    /// Download failed.
    #[error("failed to download {artifact}: {reason}")]
    Download { artifact: ArtifactId, reason: String },

    /// Archive could not be unpacked.
    #[error("failed to unpack {artifact}: {reason}")]
    Extract { artifact: ArtifactId, reason: String },

    /// Bundle manifest is present but malformed.
    #[error("invalid manifest in {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProvisionError {
    pub fn unavailable(artifact: &ArtifactId, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            artifact: artifact.clone(),
            reason: reason.into(),
        }
    }
}

/// Port for obtaining bundle directories.
#[cfg_attr(test, mockall::automock)]
pub trait BundleFetcher: Send + Sync {
    /// Return the root directory of the unpacked bundle.
    fn fetch(&self, artifact: &ArtifactId) -> Result<PathBuf, ProvisionError>;
}
