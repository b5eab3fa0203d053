//! Subcommands.

use clap::Subcommand;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Report whether a usable toolkit was found, and why not
    Status,

    /// Show every resolved toolkit path
    Paths {
        /// Print the resolved toolkit as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pick a host compiler compatible with the resolved toolkit
    Compiler,

    /// Print the path of one library, binary or `libdevice`
    Library {
        /// Name such as cudart, cublasLt, nvcc, cudnn or libdevice
        name: String,
    },

    /// List bundled releases and the host compilers each supports
    Versions,
}
