//! Paths command handler.
//!
//! Prints every resolved file in `key = value` form, one per line, so the
//! output can be grepped or sourced by scripts.

use std::fmt::Write;

use anyhow::{Context, Result};
use cuprobe_core::{Discovery, Resolution};

use super::display_path;

pub fn execute(discovery: &Discovery, json: bool) -> Result<()> {
    let resolution = discovery.resolution()?;
    if json {
        println!("{}", render_json(resolution)?);
    } else {
        print!("{}", render(resolution));
    }
    Ok(())
}

pub fn render(resolution: &Resolution) -> String {
    let toolkit = &resolution.toolkit;
    let mut out = String::new();

    let _ = writeln!(out, "source = {}", toolkit.source);
    let _ = writeln!(out, "version = {}", toolkit.version);
    for prefix in &toolkit.prefixes {
        let _ = writeln!(out, "prefix = {}", prefix.display());
    }
    for (library, path) in &toolkit.libraries {
        let _ = writeln!(out, "lib.{library} = {}", display_path(path.as_deref()));
    }
    for (binary, path) in &toolkit.binaries {
        let _ = writeln!(out, "bin.{binary} = {}", display_path(path.as_deref()));
    }
    let _ = writeln!(out, "libdevice = {}", display_path(toolkit.libdevice.as_deref()));
    for (library, info) in &resolution.optional {
        let path = info.as_ref().map(|i| i.path.as_path());
        let _ = writeln!(out, "opt.{library} = {}", display_path(path));
    }
    out
}

pub fn render_json(resolution: &Resolution) -> Result<String> {
    let value = serde_json::json!({
        "toolkit": resolution.toolkit,
        "optional": resolution.optional,
        "driver_ceiling": resolution.driver_ceiling,
        "warnings": resolution.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
    });
    serde_json::to_string_pretty(&value).context("Failed to serialize resolution")
}
