//! Composition root.
//!
//! Wires the concrete adapters of this crate into a [`Discovery`]. Callers
//! that need a single process-wide instance use [`global`]; everyone else
//! builds their own with [`build_discovery`].

use std::sync::{Arc, OnceLock};

use cuprobe_core::{
    ConfigError, Discovery, DiscoveryConfig, DiscoveryPorts, EnvSource, LibraryLoader, Platform,
    ProcessEnv,
};
use tracing::debug;

use crate::artifacts::{ArtifactStore, DownloadProgress};
use crate::command::CommandVersionProbe;
use crate::driver::{DriverLibraryBinder, NvidiaDriver};
use crate::loader::HeaderCheckLoader;

/// Options that do not belong in [`DiscoveryConfig`].
#[derive(Default)]
pub struct RuntimeOptions {
    /// Platform override; the host platform when unset.
    pub platform: Option<Platform>,
    /// Environment override; the process environment when unset.
    pub env: Option<Arc<dyn EnvSource>>,
    /// Bundle download progress.
    pub progress: Option<DownloadProgress>,
}

/// Ports backed by the host system.
pub fn host_ports(
    config: &DiscoveryConfig,
    platform: &Platform,
    env: &Arc<dyn EnvSource>,
    progress: Option<DownloadProgress>,
) -> DiscoveryPorts {
    let loader: Arc<dyn LibraryLoader> = Arc::new(HeaderCheckLoader::new(platform.family()));

    let mut store = ArtifactStore::from_config(config, platform.clone());
    if let Some(progress) = progress {
        store = store.with_progress(progress);
    }
    debug!(cache = %store.cache_dir().display(), url = ?config.artifact_url, "artifact store");

    DiscoveryPorts {
        driver: Arc::new(NvidiaDriver::new(
            platform.clone(),
            env.clone(),
            config.probe_timeout(),
        )),
        binder: Arc::new(DriverLibraryBinder::new(
            platform.clone(),
            env.clone(),
            loader.clone(),
        )),
        fetcher: Arc::new(store),
        versions: Arc::new(CommandVersionProbe::new(config.probe_timeout())),
        loader,
    }
}

/// Build a [`Discovery`] over the host system.
pub fn build_discovery(config: DiscoveryConfig, options: RuntimeOptions) -> Discovery {
    let platform = options.platform.unwrap_or_else(Platform::host);
    let env: Arc<dyn EnvSource> = options.env.unwrap_or_else(|| Arc::new(ProcessEnv));
    let ports = host_ports(&config, &platform, &env, options.progress);

    Discovery::new(config, ports)
        .with_platform(platform)
        .with_env(env)
}

/// [`build_discovery`] with configuration read from the process environment.
pub fn default_discovery() -> Result<Discovery, ConfigError> {
    let platform = Platform::host();
    let config = DiscoveryConfig::from_env(&ProcessEnv, &platform)?;
    Ok(build_discovery(
        config,
        RuntimeOptions {
            platform: Some(platform),
            ..RuntimeOptions::default()
        },
    ))
}

static GLOBAL: OnceLock<Result<Discovery, ConfigError>> = OnceLock::new();

/// The process-wide [`Discovery`], configured from the environment on first
/// use. A configuration error is sticky: every call reports it.
pub fn global() -> Result<&'static Discovery, ConfigError> {
    GLOBAL
        .get_or_init(default_discovery)
        .as_ref()
        .map_err(Clone::clone)
}
