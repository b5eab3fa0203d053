//! CUDA toolkit discovery.
//!
//! Decides at run time which CUDA toolkit a process should bind against:
//! a pre-packaged bundle the driver can run, or else a local installation.
//! This crate holds the domain types, the search and selection algorithms,
//! the port traits for everything that touches the outside world, and the
//! memoized [`Discovery`] state machine. Adapters live in `cuprobe-runtime`.
#![deny(unused_crate_dependencies)]

pub mod compat;
pub mod config;
pub mod discovery;
pub mod env;
pub mod library;
pub mod platform;
pub mod ports;
pub mod search;
pub mod state;
pub mod toolkit;
pub mod version;

pub use compat::{BUNDLED_RELEASES, CompilerFamily};
pub use config::{ConfigError, DiscoveryConfig};
pub use discovery::{
    CompilerCandidate, CompilerError, DiscoveryError, DiscoveryWarning, FailureReason, Lookup,
};
pub use env::{EnvSource, MapEnv, ProcessEnv};
pub use library::{OptionalLibrary, ToolkitBinary, ToolkitLibrary};
pub use platform::{OsFamily, Platform};
pub use ports::{
    ArtifactId, BundleFetcher, DriverPort, LibraryLoader, LoadError, ProvisionError, Readiness,
    RuntimeBinderPort, VersionError, VersionProbe, VersionQuery,
};
pub use search::{SearchError, Searcher};
pub use state::{Discovery, DiscoveryFailure, DiscoveryPorts, Resolution, ResolutionState};
pub use toolkit::{OptionalLibraryInfo, ResolvedToolkit, ToolkitSource};
pub use version::{Version, VersionParseError};

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    /// Create an empty file, with parents.
    pub fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"").unwrap();
    }

    /// Create an empty file with the executable bits set.
    pub fn touch_executable(path: &Path) {
        touch(path);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }
}
