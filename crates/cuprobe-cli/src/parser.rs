//! Root CLI parser and global options.

use std::path::PathBuf;

use clap::Parser;
use cuprobe_core::Version;

use crate::commands::Commands;

/// Command-line interface for CUDA toolkit discovery.
///
/// Global flags override the matching `CUPROBE_*` environment variables.
#[derive(Parser)]
#[command(name = "cuprobe")]
#[command(about = "Find the CUDA toolkit this machine can run")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Pin a toolkit release (e.g. 12.4)
    #[arg(long = "toolkit-version", global = true, value_name = "X.Y")]
    pub toolkit_version: Option<Version>,

    /// Never use pre-packaged bundles
    #[arg(long = "no-bundled", global = true)]
    pub no_bundled: bool,

    /// Toolkit root to try before anything else (repeatable)
    #[arg(long = "toolkit-dir", global = true, value_name = "DIR")]
    pub toolkit_dirs: Vec<PathBuf>,

    /// Base URL to download bundles from
    #[arg(long = "artifact-url", global = true, env = "CUPROBE_ARTIFACT_URL")]
    pub artifact_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}
