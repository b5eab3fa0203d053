//! Versions command handler.

use std::fmt::Write;

use anyhow::Result;
use cuprobe_core::{CompilerFamily, Discovery, Version};

/// Families shown in the table, in column order.
const FAMILIES: [CompilerFamily; 3] = [
    CompilerFamily::Gcc,
    CompilerFamily::Clang,
    CompilerFamily::Msvc,
];

/// Print the table. Only the driver is consulted; nothing is resolved.
pub fn execute(discovery: &Discovery) -> Result<()> {
    let ceiling = discovery.driver_ceiling();
    print!(
        "{}",
        render(
            discovery.bundled_releases(),
            ceiling,
            discovery.config().pinned_version
        )
    );
    Ok(())
}

pub fn render(releases: &[Version], ceiling: Option<Version>, pin: Option<Version>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:<8} {:<8} {:<8} {:<8}",
        "RELEASE", "DRIVER", "GCC", "CLANG", "MSVC"
    );

    let mut sorted = releases.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.dedup();

    for release in sorted {
        let driver = match ceiling {
            Some(max) if release.release() > max.release() => "no",
            Some(_) => "yes",
            None => "?",
        };
        let bounds: Vec<String> = FAMILIES
            .iter()
            .map(|family| {
                family
                    .max_supported(release)
                    .map_or_else(|| "-".to_string(), |v| bound(*family, v))
            })
            .collect();
        let marker = if pin.is_some_and(|p| p.same_release(release)) {
            " *"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "{:<10} {:<8} {:<8} {:<8} {:<8}{marker}",
            release.release_string(),
            driver,
            bounds[0],
            bounds[1],
            bounds[2]
        );
    }
    out
}

fn bound(family: CompilerFamily, version: Version) -> String {
    match family {
        CompilerFamily::Msvc => format!("<={}", version.release_string()),
        CompilerFamily::Gcc | CompilerFamily::Clang => format!("<={}", version.major),
    }
}
