//! `cuprobe` command-line front end.
//!
//! Thin adapter over `cuprobe-runtime`: parses flags, layers them over the
//! environment configuration, and prints what discovery decided.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tempfile as _;

// Used by the binary target
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod handlers;
pub mod parser;

pub use bootstrap::{bootstrap, discovery_config};
pub use commands::Commands;
pub use parser::Cli;
