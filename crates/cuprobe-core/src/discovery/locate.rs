//! Local toolkit discovery.
//!
//! Gathers candidate install roots from every source we know about, keeps
//! the ones that exist, and describes the first one. Later sources only
//! matter when earlier ones are empty.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use strum::IntoEnumIterator;
use tracing::debug;

use super::{DiscoveryContext, DiscoveryWarning, FailureReason, Lookup, Warnings};
use crate::library::{ToolkitBinary, ToolkitLibrary};
use crate::platform::Platform;
use crate::ports::{VersionError, VersionQuery};
use crate::search::{dedupe_paths, install_root_of};
use crate::toolkit::{ResolvedToolkit, ToolkitSource};
use crate::version::Version;

/// Majors tried when corroborating a runtime library of unknown release.
const CORROBORATION_MAJORS: std::ops::RangeInclusive<u32> = 10..=13;

/// Find and describe a local toolkit installation.
pub fn locate_toolkit(
    ctx: &DiscoveryContext<'_>,
    explicit_dirs: &[PathBuf],
    root_vars: &[&str],
    warnings: &mut Warnings,
) -> Lookup<ResolvedToolkit> {
    let roots = candidate_roots(ctx, explicit_dirs, root_vars, warnings);
    let Some((root, others)) = roots.split_first() else {
        debug!("no local CUDA installation found");
        return Lookup::NotFound;
    };

    if !others.is_empty() {
        warnings.record(DiscoveryWarning::MultipleInstallations {
            chosen: root.clone(),
            others: others.to_vec(),
        });
    }

    let version = match toolkit_version(ctx, root) {
        Ok(Some(version)) => version,
        Ok(None) => {
            debug!(root = %root.display(), "no nvcc or ptxas under toolkit root");
            return Lookup::NotFound;
        }
        Err((path, e)) => {
            let reason = e.to_string();
            warnings.record(DiscoveryWarning::UnreadableVersion {
                path,
                reason: reason.clone(),
            });
            return Lookup::Failed(FailureReason::ToolkitVersionUnreadable {
                root: root.clone(),
                reason,
            });
        }
    };

    debug!(root = %root.display(), %version, "found local CUDA toolkit");
    Lookup::Found(local_layout(ctx, root, version))
}

/// Existing candidate roots in priority order, canonicalized and deduplicated.
pub fn candidate_roots(
    ctx: &DiscoveryContext<'_>,
    explicit_dirs: &[PathBuf],
    root_vars: &[&str],
    warnings: &mut Warnings,
) -> Vec<PathBuf> {
    let searcher = ctx.searcher;
    let env = searcher.env();
    let platform = searcher.platform();

    let mut roots: Vec<PathBuf> = explicit_dirs.to_vec();

    let populated: Vec<(String, String)> = root_vars
        .iter()
        .filter_map(|var| env.var(var).map(|value| ((*var).to_string(), value)))
        .collect();
    let mut distinct: Vec<&str> = populated.iter().map(|(_, v)| v.as_str()).collect();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() > 1 {
        warnings.record(DiscoveryWarning::AmbiguousEnvironment {
            vars: populated.clone(),
        });
    }
    roots.extend(populated.into_iter().map(|(_, value)| PathBuf::from(value)));

    if let Ok(nvcc) = searcher.find_binary(ToolkitBinary::Nvcc.stem(), &[]) {
        roots.extend(install_root_of(&nvcc));
    }
    let cudart_names = any_release_names(platform, ToolkitLibrary::Cudart.stem());
    if let Ok(cudart) = searcher.find_library(&cudart_names, &[]) {
        roots.extend(library_root_of(&cudart));
    }
    if let Ok(ptxas) = searcher.find_binary(ToolkitBinary::Ptxas.stem(), &[]) {
        roots.extend(install_root_of(&ptxas));
    }

    roots.extend(platform.conventional_toolkit_roots(env));

    let existing = roots
        .into_iter()
        .filter(|root| root.is_dir())
        .map(|root| std::fs::canonicalize(&root).unwrap_or(root))
        .collect();
    dedupe_paths(existing)
}

/// Version of the toolkit under `root`, from `nvcc` or else `ptxas`.
///
/// `Ok(None)` when neither binary exists. A binary that exists but cannot
/// be queried is an error carrying its path.
pub fn toolkit_version(
    ctx: &DiscoveryContext<'_>,
    root: &Path,
) -> Result<Option<Version>, (PathBuf, VersionError)> {
    let prefixes = [root.to_path_buf()];
    let query = VersionQuery::nvcc();

    for binary in [ToolkitBinary::Nvcc, ToolkitBinary::Ptxas] {
        let Ok(path) = ctx.searcher.find_binary_under(binary.stem(), &prefixes) else {
            continue;
        };
        match ctx.versions.query(&path, &query) {
            Ok(version) => return Ok(Some(version)),
            Err(e) if e.is_missing() => {}
            Err(e) => return Err((path, e)),
        }
    }

    Ok(None)
}

fn local_layout(ctx: &DiscoveryContext<'_>, root: &Path, version: Version) -> ResolvedToolkit {
    let searcher = ctx.searcher;
    let platform = searcher.platform();
    let root_prefix = [root.to_path_buf()];

    let libraries: BTreeMap<ToolkitLibrary, Option<PathBuf>> = ToolkitLibrary::iter()
        .map(|lib| {
            let mut prefixes = root_prefix.to_vec();
            if let Some(extra) = lib.extra_subdir() {
                prefixes.push(root.join(extra));
            }
            let names = platform.library_file_names(lib.stem(), Some(version));
            (lib, searcher.find_library(&names, &prefixes).ok())
        })
        .collect();

    let binaries: BTreeMap<ToolkitBinary, Option<PathBuf>> = ToolkitBinary::iter()
        .map(|bin| (bin, searcher.find_binary_under(bin.stem(), &root_prefix).ok()))
        .collect();

    ResolvedToolkit {
        source: ToolkitSource::Local,
        version,
        prefixes: root_prefix.to_vec(),
        libraries,
        binaries,
        libdevice: find_libdevice(root),
    }
}

fn find_libdevice(root: &Path) -> Option<PathBuf> {
    let dir = root.join("nvvm").join("libdevice");
    let mut matches: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path.extension().is_some_and(|ext| ext == "bc")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("libdevice"))
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}

/// File names for a library of any plausible major release.
fn any_release_names(platform: &Platform, stem: &str) -> Vec<String> {
    let mut names = Vec::new();
    for major in CORROBORATION_MAJORS.rev() {
        for name in platform.library_file_names(stem, Some(Version::release_of(major, 0))) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// Install root of a runtime library, if it sits in a toolkit-shaped tree.
///
/// Only `lib`, `lib64` and `bin` parents count. Libraries under
/// `targets/<triple>/lib` map to the directory holding `targets`.
fn library_root_of(library: &Path) -> Option<PathBuf> {
    let dir_name = library.parent()?.file_name()?.to_str()?;
    if !matches!(dir_name, "lib" | "lib64" | "bin") {
        return None;
    }

    let root = install_root_of(library)?;
    match root.parent() {
        Some(targets) if targets.file_name().is_some_and(|n| n == "targets") => {
            targets.parent().map(Path::to_path_buf)
        }
        _ => Some(root),
    }
}
