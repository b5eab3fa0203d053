//! Status command handler.

use std::fmt::Write;

use anyhow::Result;
use cuprobe_core::{Discovery, ResolutionState};

/// Print the resolution outcome. Returns whether a toolkit is usable.
pub fn execute(discovery: &Discovery) -> Result<bool> {
    let functional = discovery.functional(false);
    print!("{}", render(discovery.state()));
    Ok(functional)
}

pub fn render(state: &ResolutionState) -> String {
    let mut out = String::new();
    match state {
        ResolutionState::Unresolved => out.push_str("CUDA: not resolved\n"),
        ResolutionState::Resolved(resolution) => {
            let toolkit = &resolution.toolkit;
            let _ = writeln!(out, "CUDA: functional");
            let _ = writeln!(out, "  version: {} ({})", toolkit.version, toolkit.source);
            if let Some(prefix) = toolkit.prefixes.first() {
                let _ = writeln!(out, "  prefix:  {}", prefix.display());
            }
            let ceiling = resolution
                .driver_ceiling
                .map_or_else(|| "unknown".to_string(), |v| v.release_string());
            let _ = writeln!(out, "  driver supports up to: {ceiling}");

            let missing = toolkit.missing_libraries();
            if !missing.is_empty() {
                let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
                let _ = writeln!(out, "  missing libraries: {}", names.join(", "));
            }
        }
        ResolutionState::Failed(failure) => {
            let _ = writeln!(out, "CUDA: not functional");
            let _ = writeln!(out, "  reason: {}", failure.reason);
        }
    }

    let warnings = state.warnings();
    if !warnings.is_empty() {
        let _ = writeln!(out, "warnings:");
        for warning in warnings {
            let _ = writeln!(out, "  - {warning}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use cuprobe_core::{DiscoveryFailure, DiscoveryWarning, FailureReason, Version};

    use super::*;
    use crate::handlers::fixtures;

    #[test]
    fn test_render_resolved() {
        let out = render(&ResolutionState::Resolved(fixtures::resolution()));
        assert!(out.starts_with("CUDA: functional\n"));
        assert!(out.contains("version: 12.2.140 (local)"));
        assert!(out.contains("driver supports up to: 12.4"));
        assert!(out.contains("missing libraries: cublas"));
        assert!(!out.contains("warnings:"));
    }

    #[test]
    fn test_render_failure_with_warnings() {
        let state = ResolutionState::Failed(DiscoveryFailure {
            reason: FailureReason::ToolkitNotFound,
            warnings: vec![DiscoveryWarning::PinMismatch {
                pinned: Version::release_of(12, 4),
                found: Version::new(11, 8, 89),
            }],
        });
        let out = render(&state);
        assert!(out.starts_with("CUDA: not functional\n"));
        assert!(out.contains(&format!("reason: {}", FailureReason::ToolkitNotFound)));
        assert!(out.contains("warnings:\n  - CUDA 12.4 was requested"));
    }
}
