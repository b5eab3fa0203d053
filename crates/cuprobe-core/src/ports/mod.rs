//! Port definitions for discovery collaborators.
//!
//! Core owns the traits; `cuprobe-runtime` owns the implementations that
//! spawn processes, read the driver and download bundles. Every port is
//! `Send + Sync` so a `Discovery` can be shared between threads.

mod bundle;
mod driver;
mod loader;
mod version;

pub use bundle::{ArtifactId, BundleFetcher, ProvisionError, TOOLKIT_ARTIFACT};
pub use driver::{DriverPort, Readiness, RuntimeBinderPort};
pub use loader::{LibraryLoader, LoadError};
pub use version::{VersionError, VersionProbe, VersionQuery};

#[cfg(test)]
pub use bundle::MockBundleFetcher;
#[cfg(test)]
pub use driver::{MockDriverPort, MockRuntimeBinderPort};
#[cfg(test)]
pub use loader::MockLibraryLoader;
#[cfg(test)]
pub use version::MockVersionProbe;
