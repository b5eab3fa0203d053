//! Discovery errors and warnings.
//!
//! Three severities are kept apart: a single strategy not finding anything
//! is not an error at all (see [`Lookup::NotFound`](super::Lookup)),
//! [`DiscoveryWarning`]s are recorded and logged but resolution carries
//! on, and [`FailureReason`]s end resolution in the failed state.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use crate::library::{OptionalLibrary, ToolkitBinary, ToolkitLibrary};
use crate::version::Version;

/// Why resolution ended in the failed state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("the device driver is not functional: {0}")]
    DriverUnavailable(String),

    #[error("the runtime binder is not functional: {0}")]
    BinderUnavailable(String),

    #[error("no CUDA toolkit found: no usable bundle and no local installation")]
    ToolkitNotFound,

    #[error("CUDA toolkit at {root} has an unreadable version: {reason}")]
    ToolkitVersionUnreadable { root: PathBuf, reason: String },
}

/// Host compiler selection failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilerError {
    #[error("no host compiler compatibility data for CUDA {}", toolkit.release_string())]
    NoCompatibilityData { toolkit: Version },

    #[error(
        "no compatible host compiler for CUDA {} (requires {required}); found: {}",
        toolkit.release_string(),
        if found.is_empty() { "none".to_string() } else { found.join(", ") }
    )]
    NoneCompatible {
        toolkit: Version,
        required: String,
        found: Vec<String>,
    },
}

/// Errors returned by `Discovery` accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("CUDA toolkit unavailable: {0}")]
    Unavailable(FailureReason),

    #[error("library {0} is not part of the resolved toolkit")]
    LibraryMissing(ToolkitLibrary),

    #[error("binary {0} is not part of the resolved toolkit")]
    BinaryMissing(ToolkitBinary),

    #[error("optional library {0} is not available")]
    OptionalMissing(OptionalLibrary),

    #[error("libdevice is not part of the resolved toolkit")]
    LibdeviceMissing,

    #[error(transparent)]
    Compiler(#[from] CompilerError),
}

/// A non-fatal problem noticed during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryWarning {
    /// Several toolkit-root variables are set to different values.
    AmbiguousEnvironment { vars: Vec<(String, String)> },
    /// More than one local installation was found; the first was chosen.
    MultipleInstallations { chosen: PathBuf, others: Vec<PathBuf> },
    /// A binary was found but its version could not be read.
    UnreadableVersion { path: PathBuf, reason: String },
    /// An optional library targets a different toolkit release.
    LibrarySkew {
        library: OptionalLibrary,
        target: Version,
        toolkit: Version,
    },
    /// The toolkit is newer than the driver supports.
    DriverTooOld { toolkit: Version, ceiling: Version },
    /// A local toolkit does not match the pinned release.
    PinMismatch { pinned: Version, found: Version },
    /// A library was found but the loader rejected it.
    LibraryUnloadable { path: PathBuf, reason: String },
}

impl fmt::Display for DiscoveryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmbiguousEnvironment { vars } => {
                let listed: Vec<String> = vars.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(
                    f,
                    "multiple toolkit root variables with different values: {}",
                    listed.join(", ")
                )
            }
            Self::MultipleInstallations { chosen, others } => {
                let listed: Vec<String> = others.iter().map(|p| p.display().to_string()).collect();
                write!(
                    f,
                    "multiple CUDA installations found; using {} (also found: {})",
                    chosen.display(),
                    listed.join(", ")
                )
            }
            Self::UnreadableVersion { path, reason } => {
                write!(f, "could not read the version of {}: {reason}", path.display())
            }
            Self::LibrarySkew {
                library,
                target,
                toolkit,
            } => write!(
                f,
                "{library} was built for CUDA {}, but CUDA {} was selected",
                target.release_string(),
                toolkit.release_string()
            ),
            Self::DriverTooOld { toolkit, ceiling } => write!(
                f,
                "CUDA {} is newer than the driver supports (up to {})",
                toolkit.release_string(),
                ceiling.release_string()
            ),
            Self::PinMismatch { pinned, found } => write!(
                f,
                "CUDA {} was requested but the local toolkit is {}",
                pinned.release_string(),
                found
            ),
            Self::LibraryUnloadable { path, reason } => {
                write!(f, "ignoring {}: {reason}", path.display())
            }
        }
    }
}

/// Ordered collection of warnings; each one is logged when recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Warnings(Vec<DiscoveryWarning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, warning: DiscoveryWarning) {
        warn!("{warning}");
        self.0.push(warning);
    }

    pub fn as_slice(&self) -> &[DiscoveryWarning] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<DiscoveryWarning> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages_mention_the_toolkit() {
        let msg = DiscoveryError::Unavailable(FailureReason::ToolkitNotFound).to_string();
        assert!(msg.contains("toolkit"));
    }

    #[test]
    fn test_compiler_error_lists_found_compilers() {
        let err = CompilerError::NoneCompatible {
            toolkit: Version::new(11, 8, 89),
            required: "GCC <= 11".to_string(),
            found: vec!["GCC 13.2.0 (/usr/bin/gcc)".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("CUDA 11.8"));
        assert!(msg.contains("GCC <= 11"));
        assert!(msg.contains("/usr/bin/gcc"));
    }

    #[test]
    fn test_skew_warning_text() {
        let warning = DiscoveryWarning::LibrarySkew {
            library: OptionalLibrary::Cudnn,
            target: Version::release_of(10, 1),
            toolkit: Version::new(10, 2, 89),
        };
        assert_eq!(
            warning.to_string(),
            "cudnn was built for CUDA 10.1, but CUDA 10.2 was selected"
        );
    }
}
