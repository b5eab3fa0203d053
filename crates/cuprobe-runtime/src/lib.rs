//! Host adapters for cuprobe.
//!
//! Implements the ports declared in `cuprobe-core` against the real system:
//! bounded subprocess version probes, the NVIDIA driver probe, header-level
//! library validation and the on-disk bundle store with optional downloads.
#![deny(unsafe_code)]

pub mod artifacts;
mod bootstrap;
mod command;
pub mod driver;
mod loader;

// Composition root
pub use bootstrap::{RuntimeOptions, build_discovery, default_discovery, global, host_ports};

// Port implementations
pub use artifacts::{ArtifactStore, DownloadProgress, default_data_dir};
pub use command::{CommandVersionProbe, run_captured};
pub use driver::{DriverLibraryBinder, NvidiaDriver, parse_smi_output};
pub use loader::HeaderCheckLoader;

#[cfg(feature = "cli")]
pub use artifacts::terminal_progress;
