//! Host compiler selection.
//!
//! `nvcc` refuses host compilers newer than its release supports. We probe
//! every compiler on `PATH` the platform knows about and pick the newest
//! one the toolkit accepts.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CompilerError, DiscoveryContext};
use crate::compat::CompilerFamily;
use crate::version::Version;

/// A host compiler found on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerCandidate {
    pub family: CompilerFamily,
    pub path: PathBuf,
    pub version: Version,
}

impl fmt::Display for CompilerCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.family, self.version, self.path.display())
    }
}

/// Every host compiler on `PATH` whose version could be read.
///
/// Names resolving to the same file (`gcc` and `gcc-13`) are reported once,
/// under the first name probed.
pub fn compiler_candidates(ctx: &DiscoveryContext<'_>) -> Vec<CompilerCandidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for (family, name) in ctx.searcher.platform().host_compilers() {
        let Ok(path) = ctx.searcher.find_binary(&name, &[]) else {
            continue;
        };
        let real = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if !seen.insert(real) {
            continue;
        }

        match ctx.versions.query(&path, &family.version_query()) {
            Ok(version) => candidates.push(CompilerCandidate {
                family,
                path,
                version,
            }),
            Err(e) => debug!(path = %path.display(), error = %e, "skipping host compiler"),
        }
    }

    candidates
}

/// Pick the host compiler to use with a toolkit of version `toolkit`.
///
/// Families are considered in the platform's enumeration order; the
/// newest compatible compiler of the first family with one wins.
pub fn match_host_compiler(
    ctx: &DiscoveryContext<'_>,
    toolkit: Version,
) -> Result<CompilerCandidate, CompilerError> {
    let mut families: Vec<CompilerFamily> = Vec::new();
    for (family, _) in ctx.searcher.platform().host_compilers() {
        if !families.contains(&family) {
            families.push(family);
        }
    }

    let bounds: Vec<(CompilerFamily, Version)> = families
        .into_iter()
        .filter_map(|family| family.max_supported(toolkit).map(|bound| (family, bound)))
        .collect();
    if bounds.is_empty() {
        return Err(CompilerError::NoCompatibilityData { toolkit });
    }

    let candidates = compiler_candidates(ctx);
    for (family, _) in &bounds {
        let best = candidates
            .iter()
            .filter(|c| c.family == *family && family.supports(toolkit, c.version))
            .max_by_key(|c| c.version);
        if let Some(best) = best {
            debug!(compiler = %best, "selected host compiler");
            return Ok(best.clone());
        }
    }

    Err(CompilerError::NoneCompatible {
        toolkit,
        required: bounds
            .iter()
            .map(|(family, bound)| format!("{family} <= {}", bound_string(*family, *bound)))
            .collect::<Vec<_>>()
            .join(", "),
        found: candidates.iter().map(ToString::to_string).collect(),
    })
}

fn bound_string(family: CompilerFamily, bound: Version) -> String {
    match family {
        CompilerFamily::Gcc | CompilerFamily::Clang => bound.major.to_string(),
        CompilerFamily::Msvc => bound.release_string(),
    }
}
