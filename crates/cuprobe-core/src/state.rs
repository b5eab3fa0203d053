//! Lazy, memoized toolkit resolution.
//!
//! A [`Discovery`] resolves at most once. The first accessor call runs the
//! whole sequence (driver and binder checks, bundle selection, local
//! fallback, optional libraries, post checks) and stores the outcome;
//! every later call reads the stored state. Concurrent first callers block
//! until the single resolution finishes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::compat::BUNDLED_RELEASES;
use crate::config::{DiscoveryConfig, TOOLKIT_ROOT_VARS};
use crate::discovery::{
    BundleProvisioner, CompilerCandidate, DiscoveryContext, DiscoveryError, DiscoveryWarning,
    FailureReason, Lookup, Warnings, locate_toolkit, match_host_compiler, resolve_bundled,
    resolve_optional,
};
use crate::env::{EnvSource, ProcessEnv};
use crate::library::{OptionalLibrary, ToolkitBinary, ToolkitLibrary};
use crate::platform::Platform;
use crate::ports::{
    BundleFetcher, DriverPort, LibraryLoader, Readiness, RuntimeBinderPort, VersionProbe,
};
use crate::search::Searcher;
use crate::toolkit::{OptionalLibraryInfo, ResolvedToolkit, ToolkitSource};
use crate::version::Version;

/// Collaborators a [`Discovery`] talks to.
#[derive(Clone)]
pub struct DiscoveryPorts {
    pub driver: Arc<dyn DriverPort>,
    pub binder: Arc<dyn RuntimeBinderPort>,
    pub fetcher: Arc<dyn BundleFetcher>,
    pub versions: Arc<dyn VersionProbe>,
    pub loader: Arc<dyn LibraryLoader>,
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub toolkit: ResolvedToolkit,
    /// Every optional library, present or not.
    pub optional: BTreeMap<OptionalLibrary, Option<OptionalLibraryInfo>>,
    /// Newest release the driver supports, when it said.
    pub driver_ceiling: Option<Version>,
    pub warnings: Vec<DiscoveryWarning>,
}

/// A failed resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryFailure {
    pub reason: FailureReason,
    /// Warnings recorded before the failure.
    pub warnings: Vec<DiscoveryWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    Resolved(Resolution),
    Failed(DiscoveryFailure),
}

impl ResolutionState {
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn warnings(&self) -> &[DiscoveryWarning] {
        match self {
            Self::Unresolved => &[],
            Self::Resolved(resolution) => &resolution.warnings,
            Self::Failed(failure) => &failure.warnings,
        }
    }
}

static UNRESOLVED: ResolutionState = ResolutionState::Unresolved;

/// Process-level toolkit discovery.
pub struct Discovery {
    config: DiscoveryConfig,
    platform: Platform,
    env: Arc<dyn EnvSource>,
    ports: DiscoveryPorts,
    bundled_releases: Vec<Version>,
    state: OnceLock<ResolutionState>,
    compiler: OnceLock<Result<CompilerCandidate, DiscoveryError>>,
}

impl Discovery {
    /// Discovery for the host platform and the process environment.
    pub fn new(config: DiscoveryConfig, ports: DiscoveryPorts) -> Self {
        Self {
            config,
            platform: Platform::host(),
            env: Arc::new(ProcessEnv),
            ports,
            bundled_releases: BUNDLED_RELEASES.to_vec(),
            state: OnceLock::new(),
            compiler: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = env;
        self
    }

    /// Replace the set of releases published as bundles.
    #[must_use]
    pub fn with_bundled_releases(mut self, releases: Vec<Version>) -> Self {
        self.bundled_releases = releases;
        self
    }

    pub const fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn bundled_releases(&self) -> &[Version] {
        &self.bundled_releases
    }

    /// Resolve if needed; `true` when a toolkit is available.
    pub fn ensure_resolved(&self) -> bool {
        self.state().is_resolved()
    }

    /// Like [`ensure_resolved`](Self::ensure_resolved), optionally logging
    /// why the toolkit is unavailable.
    pub fn functional(&self, show_reason: bool) -> bool {
        match self.state() {
            ResolutionState::Resolved(_) => true,
            ResolutionState::Failed(failure) => {
                if show_reason {
                    warn!("CUDA unavailable: {}", failure.reason);
                } else {
                    debug!(reason = %failure.reason, "CUDA unavailable");
                }
                false
            }
            ResolutionState::Unresolved => false,
        }
    }

    /// Current state, resolving first if needed.
    pub fn state(&self) -> &ResolutionState {
        self.state.get_or_init(|| self.resolve())
    }

    /// Current state without triggering resolution.
    pub fn peek(&self) -> &ResolutionState {
        self.state.get().unwrap_or(&UNRESOLVED)
    }

    pub fn resolution(&self) -> Result<&Resolution, DiscoveryError> {
        match self.state() {
            ResolutionState::Resolved(resolution) => Ok(resolution),
            ResolutionState::Failed(failure) => {
                Err(DiscoveryError::Unavailable(failure.reason.clone()))
            }
            ResolutionState::Unresolved => {
                Err(DiscoveryError::Unavailable(FailureReason::ToolkitNotFound))
            }
        }
    }

    pub fn toolkit(&self) -> Result<&ResolvedToolkit, DiscoveryError> {
        self.resolution().map(|r| &r.toolkit)
    }

    pub fn prefixes(&self) -> Result<&[PathBuf], DiscoveryError> {
        self.toolkit().map(|t| t.prefixes.as_slice())
    }

    pub fn version(&self) -> Result<Version, DiscoveryError> {
        self.toolkit().map(|t| t.version)
    }

    pub fn release(&self) -> Result<Version, DiscoveryError> {
        self.toolkit().map(ResolvedToolkit::release)
    }

    pub fn source(&self) -> Result<ToolkitSource, DiscoveryError> {
        self.toolkit().map(|t| t.source)
    }

    pub fn library_path(&self, library: ToolkitLibrary) -> Result<&Path, DiscoveryError> {
        self.toolkit()?
            .library(library)
            .ok_or(DiscoveryError::LibraryMissing(library))
    }

    pub fn binary_path(&self, binary: ToolkitBinary) -> Result<&Path, DiscoveryError> {
        self.toolkit()?
            .binary(binary)
            .ok_or(DiscoveryError::BinaryMissing(binary))
    }

    pub fn libdevice(&self) -> Result<&Path, DiscoveryError> {
        self.toolkit()?
            .libdevice
            .as_deref()
            .ok_or(DiscoveryError::LibdeviceMissing)
    }

    /// `false` when the library is absent or nothing was resolved.
    pub fn has_optional_library(&self, library: OptionalLibrary) -> bool {
        self.optional_library(library).is_ok()
    }

    pub fn optional_library(
        &self,
        library: OptionalLibrary,
    ) -> Result<&OptionalLibraryInfo, DiscoveryError> {
        self.resolution()?
            .optional
            .get(&library)
            .and_then(Option::as_ref)
            .ok_or(DiscoveryError::OptionalMissing(library))
    }

    pub fn optional_library_path(&self, library: OptionalLibrary) -> Result<&Path, DiscoveryError> {
        self.optional_library(library).map(|info| info.path.as_path())
    }

    /// Newest release the driver supports. Asks the driver port directly
    /// when nothing has been resolved yet, so no bundle is fetched.
    pub fn driver_ceiling(&self) -> Option<Version> {
        match self.peek() {
            ResolutionState::Resolved(resolution) => resolution.driver_ceiling,
            _ => self.ports.driver.max_supported_release(),
        }
    }

    /// Warnings recorded during resolution.
    pub fn warnings(&self) -> &[DiscoveryWarning] {
        self.state().warnings()
    }

    /// Host compiler for the resolved toolkit, selected on first request.
    pub fn host_compiler(&self) -> Result<&CompilerCandidate, DiscoveryError> {
        self.compiler
            .get_or_init(|| {
                let version = self.version()?;
                match_host_compiler(&self.context(), version).map_err(DiscoveryError::from)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    fn context(&self) -> DiscoveryContext<'_> {
        DiscoveryContext::new(
            Searcher::new(&self.platform, self.env.as_ref()),
            self.ports.versions.as_ref(),
        )
    }

    fn resolve(&self) -> ResolutionState {
        debug!("resolving CUDA toolkit");
        let mut warnings = Warnings::new();

        if let Readiness::Unavailable(reason) = self.ports.driver.status() {
            return failed(FailureReason::DriverUnavailable(reason), warnings);
        }
        if let Readiness::Unavailable(reason) = self.ports.binder.status() {
            return failed(FailureReason::BinderUnavailable(reason), warnings);
        }

        let ceiling = self.ports.driver.max_supported_release();
        let pin = self.config.pinned_version;
        let ctx = self.context();
        let provisioner = BundleProvisioner::new(self.ports.fetcher.as_ref(), &self.platform);

        let lookup = if self.config.use_bundled {
            resolve_bundled(&self.bundled_releases, pin, ceiling, |v| provisioner.provision(v))
        } else {
            Lookup::NotFound
        };
        let lookup = lookup.or_else(|| {
            locate_toolkit(
                &ctx,
                &self.config.toolkit_dirs,
                TOOLKIT_ROOT_VARS,
                &mut warnings,
            )
        });

        let mut toolkit = match lookup {
            Lookup::Found(toolkit) => toolkit,
            Lookup::NotFound => return failed(FailureReason::ToolkitNotFound, warnings),
            Lookup::Failed(reason) => return failed(reason, warnings),
        };

        if let Some(pinned) = pin {
            if toolkit.source == ToolkitSource::Local && !pinned.same_release(toolkit.version) {
                warnings.record(DiscoveryWarning::PinMismatch {
                    pinned,
                    found: toolkit.version,
                });
            }
        }
        if let Some(max) = ceiling {
            if toolkit.release() > max.release() {
                warnings.record(DiscoveryWarning::DriverTooOld {
                    toolkit: toolkit.version,
                    ceiling: max,
                });
            }
        }

        self.drop_unloadable(&mut toolkit, &mut warnings);

        let optional_provisioner = (self.config.use_bundled
            && toolkit.source == ToolkitSource::Bundle)
            .then_some(&provisioner);
        let mut optional = BTreeMap::new();
        for library in OptionalLibrary::iter() {
            let info = resolve_optional(&ctx, optional_provisioner, library, &toolkit)
                .filter(|info| self.loadable(&info.path, &mut warnings));

            if let Some(target) = info.as_ref().and_then(|i| i.target_release) {
                if !target.same_release(toolkit.version) {
                    warnings.record(DiscoveryWarning::LibrarySkew {
                        library,
                        target,
                        toolkit: toolkit.version,
                    });
                }
            }
            optional.insert(library, info);
        }

        info!(
            version = %toolkit.version,
            source = %toolkit.source,
            prefix = ?toolkit.prefixes.first(),
            "resolved CUDA toolkit"
        );

        ResolutionState::Resolved(Resolution {
            toolkit,
            optional,
            driver_ceiling: ceiling,
            warnings: warnings.into_vec(),
        })
    }

    /// Forget libraries the loader rejects.
    fn drop_unloadable(&self, toolkit: &mut ResolvedToolkit, warnings: &mut Warnings) {
        for path in toolkit.libraries.values_mut() {
            if path.as_deref().is_some_and(|p| !self.loadable(p, warnings)) {
                *path = None;
            }
        }
    }

    fn loadable(&self, path: &Path, warnings: &mut Warnings) -> bool {
        match self.ports.loader.load(path) {
            Ok(()) => true,
            Err(e) => {
                warnings.record(DiscoveryWarning::LibraryUnloadable {
                    path: path.to_path_buf(),
                    reason: e.reason,
                });
                false
            }
        }
    }
}

fn failed(reason: FailureReason, warnings: Warnings) -> ResolutionState {
    debug!(%reason, "CUDA toolkit resolution failed");
    ResolutionState::Failed(DiscoveryFailure {
        reason,
        warnings: warnings.into_vec(),
    })
}
