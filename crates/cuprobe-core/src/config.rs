//! Discovery configuration.
//!
//! Configuration comes from environment variables (optionally seeded from a
//! `.env` file by the CLI) and may be overridden programmatically. Values
//! that cannot be parsed are reported rather than silently ignored: a
//! mistyped version pin must not quietly select a different toolkit.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::env::EnvSource;
use crate::platform::Platform;
use crate::version::Version;

/// Pin a toolkit release (`12.4`).
pub const VERSION_VAR: &str = "CUPROBE_VERSION";
/// Enable or disable pre-packaged bundles.
pub const USE_BUNDLED_VAR: &str = "CUPROBE_USE_BUNDLED";
/// Explicit toolkit roots, as a platform path list.
pub const TOOLKIT_DIRS_VAR: &str = "CUPROBE_TOOLKIT_DIRS";
/// Subprocess timeout in seconds.
pub const PROBE_TIMEOUT_VAR: &str = "CUPROBE_PROBE_TIMEOUT";
/// Root of the artifact cache.
pub const DATA_DIR_VAR: &str = "CUPROBE_DATA_DIR";
/// Base URL bundles are downloaded from.
pub const ARTIFACT_URL_VAR: &str = "CUPROBE_ARTIFACT_URL";

/// Toolkit root overrides, highest priority first.
pub const TOOLKIT_ROOT_VARS: &[&str] = &["CUDA_HOME", "CUDA_PATH", "CUDA_ROOT", "CUDA_DIR"];

/// Default subprocess timeout.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Errors in configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Settings that steer discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Explicit toolkit release pin.
    pub pinned_version: Option<Version>,
    /// Try pre-packaged bundles before local installations.
    pub use_bundled: bool,
    /// Toolkit roots that take priority over everything else.
    pub toolkit_dirs: Vec<PathBuf>,
    /// Upper bound on any subprocess run during discovery.
    pub probe_timeout_secs: u64,
    /// Artifact cache root override.
    pub data_dir: Option<PathBuf>,
    /// Base URL for bundle downloads; unset means cache only.
    pub artifact_url: Option<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            pinned_version: None,
            use_bundled: true,
            toolkit_dirs: Vec::new(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            data_dir: None,
            artifact_url: None,
        }
    }
}

impl DiscoveryConfig {
    /// Read configuration from the environment, starting from defaults.
    pub fn from_env(env: &dyn EnvSource, platform: &Platform) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = env.var(VERSION_VAR) {
            let version = value.parse::<Version>().map_err(|_| ConfigError::InvalidValue {
                var: VERSION_VAR,
                value: value.clone(),
                expected: "version",
            })?;
            config.pinned_version = Some(version.release());
        }

        if let Some(value) = env.var(USE_BUNDLED_VAR) {
            config.use_bundled = parse_bool(&value).ok_or(ConfigError::InvalidValue {
                var: USE_BUNDLED_VAR,
                value,
                expected: "boolean",
            })?;
        }

        if let Some(value) = env.var(TOOLKIT_DIRS_VAR) {
            config.toolkit_dirs = platform.split_path_list(&value);
        }

        if let Some(value) = env.var(PROBE_TIMEOUT_VAR) {
            config.probe_timeout_secs = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: PROBE_TIMEOUT_VAR,
                    value,
                    expected: "positive number of seconds",
                })?;
        }

        config.data_dir = env.var(DATA_DIR_VAR).map(PathBuf::from);
        config.artifact_url = env.var(ARTIFACT_URL_VAR);

        Ok(config)
    }

    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
