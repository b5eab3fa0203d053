//! Optional auxiliary libraries (cuDNN, cuTENSOR).

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{BundleProvisioner, DiscoveryContext, read_manifest};
use crate::library::OptionalLibrary;
use crate::search::install_root_of;
use crate::toolkit::{OptionalLibraryInfo, ResolvedToolkit, ToolkitSource};
use crate::version::Version;

/// Look for an optional library next to `toolkit`.
///
/// When a provisioner is given (the toolkit itself came from a bundle) its
/// bundle for the toolkit's release is tried first. The local search covers
/// the library's root variable, then the toolkit prefixes, then the linker
/// search path. A local library reports its target release from a
/// `bundle.json` in its install root. Absence is not an error.
pub fn resolve_optional(
    ctx: &DiscoveryContext<'_>,
    provisioner: Option<&BundleProvisioner<'_>>,
    library: OptionalLibrary,
    toolkit: &ResolvedToolkit,
) -> Option<OptionalLibraryInfo> {
    if let Some(provisioner) = provisioner {
        match provisioner.provision_optional(library, toolkit.release()) {
            Ok(info) => return Some(info),
            Err(e) => debug!(%library, error = %e, "no bundled optional library"),
        }
    }

    let searcher = ctx.searcher;
    let mut prefixes: Vec<PathBuf> = Vec::new();
    if let Some(root) = searcher.env().var(library.root_var()) {
        prefixes.push(PathBuf::from(root));
    }
    prefixes.extend(toolkit.prefixes.iter().cloned());

    let soname = Version::release_of(library.soname_major(), 0);
    let names = searcher
        .platform()
        .library_file_names(library.stem(), Some(soname));

    match searcher.find_library(&names, &prefixes) {
        Ok(path) => {
            debug!(%library, path = %path.display(), "found optional library");
            let target_release = local_target_release(library, &path);
            Some(OptionalLibraryInfo {
                library,
                path,
                source: ToolkitSource::Local,
                target_release,
            })
        }
        Err(e) => {
            debug!(%library, error = %e, "optional library not found");
            None
        }
    }
}

fn local_target_release(library: OptionalLibrary, path: &Path) -> Option<Version> {
    let root = install_root_of(path)?;
    match read_manifest(&root) {
        Ok(manifest) => manifest.target_release.map(Version::release),
        Err(e) => {
            debug!(%library, error = %e, "ignoring unreadable manifest");
            None
        }
    }
}
