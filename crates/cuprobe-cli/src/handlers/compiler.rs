//! Compiler command handler.

use anyhow::{Context, Result};
use cuprobe_core::Discovery;

pub fn execute(discovery: &Discovery) -> Result<()> {
    let release = discovery.release()?;
    let compiler = discovery
        .host_compiler()
        .with_context(|| format!("No usable host compiler for CUDA {}", release.release_string()))?;

    println!("{compiler}");
    Ok(())
}
