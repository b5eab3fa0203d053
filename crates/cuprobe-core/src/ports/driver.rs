//! Driver and runtime-binder ports.
//!
//! Both collaborators report their own functional status. Discovery only
//! proceeds when both are ready; the driver additionally reports the newest
//! toolkit release it can run, which caps bundle selection.

use std::fmt;

use crate::version::Version;

/// Functional status of a prerequisite collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Unavailable(String),
}

impl Readiness {
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("ready"),
            Self::Unavailable(reason) => write!(f, "unavailable: {reason}"),
        }
    }
}

/// Port for the installed device driver.
#[cfg_attr(test, mockall::automock)]
pub trait DriverPort: Send + Sync {
    /// Whether a usable driver is installed.
    fn status(&self) -> Readiness;

    /// Newest toolkit release the driver supports, when known.
    fn max_supported_release(&self) -> Option<Version>;
}

/// Port for the low-level runtime binder (the layer that loads the
/// driver's user-mode library into the process).
#[cfg_attr(test, mockall::automock)]
pub trait RuntimeBinderPort: Send + Sync {
    fn status(&self) -> Readiness;
}
