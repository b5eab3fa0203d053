//! CLI bootstrap: the composition root.
//!
//! Environment configuration first, command-line flags on top, then the
//! runtime adapters with a terminal progress bar for bundle downloads.

use anyhow::{Context, Result};
use cuprobe_core::{Discovery, DiscoveryConfig, EnvSource, Platform, ProcessEnv};
use cuprobe_runtime::{RuntimeOptions, build_discovery, terminal_progress};

use crate::parser::Cli;

/// Build the discovery configuration for this invocation.
pub fn discovery_config(
    cli: &Cli,
    env: &dyn EnvSource,
    platform: &Platform,
) -> Result<DiscoveryConfig> {
    let mut config =
        DiscoveryConfig::from_env(env, platform).context("Invalid cuprobe environment")?;

    if let Some(version) = cli.toolkit_version {
        config.pinned_version = Some(version.release());
    }
    if cli.no_bundled {
        config.use_bundled = false;
    }
    if !cli.toolkit_dirs.is_empty() {
        let mut dirs = cli.toolkit_dirs.clone();
        dirs.append(&mut config.toolkit_dirs);
        config.toolkit_dirs = dirs;
    }
    if let Some(url) = &cli.artifact_url {
        config.artifact_url = Some(url.clone());
    }

    Ok(config)
}

/// Compose a [`Discovery`] over the host system.
pub fn bootstrap(cli: &Cli) -> Result<Discovery> {
    let platform = Platform::host();
    let config = discovery_config(cli, &ProcessEnv, &platform)?;
    tracing::debug!(?config, "discovery configuration");

    Ok(build_discovery(
        config,
        RuntimeOptions {
            platform: Some(platform),
            env: None,
            progress: Some(terminal_progress()),
        },
    ))
}
