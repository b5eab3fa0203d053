//! Bundle provisioning.
//!
//! A bundle's layout is a contract: once the fetcher hands back a root
//! directory, every path is derived from the platform's naming rules and
//! only checked for existence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use strum::IntoEnumIterator;
use tracing::debug;

use crate::library::{OptionalLibrary, ToolkitBinary, ToolkitLibrary};
use crate::platform::Platform;
use crate::ports::{ArtifactId, BundleFetcher, ProvisionError};
use crate::toolkit::{
    BUNDLE_MANIFEST, BundleManifest, OptionalLibraryInfo, ResolvedToolkit, ToolkitSource,
};
use crate::version::Version;

const LIBDEVICE: &str = "nvvm/libdevice/libdevice.10.bc";

/// Turns fetched bundle directories into resolved toolkits.
pub struct BundleProvisioner<'a> {
    fetcher: &'a dyn BundleFetcher,
    platform: &'a Platform,
}

impl<'a> BundleProvisioner<'a> {
    pub fn new(fetcher: &'a dyn BundleFetcher, platform: &'a Platform) -> Self {
        Self { fetcher, platform }
    }

    /// Fetch the toolkit bundle for `release` and describe its layout.
    pub fn provision(&self, release: Version) -> Result<ResolvedToolkit, ProvisionError> {
        let artifact = ArtifactId::toolkit(release);
        let root = self.fetcher.fetch(&artifact)?;
        let manifest = read_manifest(&root)?;

        let version = match manifest.version {
            Some(v) if v.same_release(release) => v,
            Some(v) => {
                return Err(ProvisionError::Manifest {
                    path: root.join(BUNDLE_MANIFEST),
                    reason: format!("bundle is {v}, expected {}", release.release_string()),
                });
            }
            None => release.release(),
        };

        debug!(root = %root.display(), %version, "provisioned toolkit bundle");
        Ok(self.layout(&root, version))
    }

    /// Fetch the bundle of an optional library built for `toolkit_release`.
    pub fn provision_optional(
        &self,
        library: OptionalLibrary,
        toolkit_release: Version,
    ) -> Result<OptionalLibraryInfo, ProvisionError> {
        let artifact = ArtifactId::new(library.stem(), toolkit_release);
        let root = self.fetcher.fetch(&artifact)?;
        let manifest = read_manifest(&root)?;

        let soname = Version::release_of(library.soname_major(), 0);
        let path = root
            .join(self.platform.bundle_library_dir())
            .join(self.platform.bundle_library_file(library.stem(), soname));
        if !path.is_file() {
            return Err(ProvisionError::unavailable(
                &artifact,
                format!("{} is missing from the bundle", path.display()),
            ));
        }

        Ok(OptionalLibraryInfo {
            library,
            path,
            source: ToolkitSource::Bundle,
            target_release: Some(manifest.target_release.unwrap_or(toolkit_release).release()),
        })
    }

    fn layout(&self, root: &Path, version: Version) -> ResolvedToolkit {
        let lib_dir = root.join(self.platform.bundle_library_dir());
        let bin_dir = root.join("bin");

        let libraries: BTreeMap<ToolkitLibrary, Option<PathBuf>> = ToolkitLibrary::iter()
            .map(|lib| {
                let path = lib_dir.join(self.platform.bundle_library_file(lib.stem(), version));
                (lib, existing(path))
            })
            .collect();

        let binaries: BTreeMap<ToolkitBinary, Option<PathBuf>> = ToolkitBinary::iter()
            .map(|bin| {
                let path = bin_dir.join(self.platform.executable_name(bin.stem()));
                (bin, existing(path))
            })
            .collect();

        ResolvedToolkit {
            source: ToolkitSource::Bundle,
            version,
            prefixes: vec![root.to_path_buf()],
            libraries,
            binaries,
            libdevice: existing(root.join(LIBDEVICE)),
        }
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

/// Read `bundle.json` from a bundle root. A missing manifest is empty.
pub fn read_manifest(root: &Path) -> Result<BundleManifest, ProvisionError> {
    let path = root.join(BUNDLE_MANIFEST);
    if !path.exists() {
        return Ok(BundleManifest::default());
    }

    let contents = std::fs::read_to_string(&path)?;
    serde_json::from_str(&contents).map_err(|e| ProvisionError::Manifest {
        path,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::OsFamily;
    use crate::ports::MockBundleFetcher;
    use crate::test_support::{touch, touch_executable};

    fn fetcher_for(root: PathBuf) -> MockBundleFetcher {
        let mut fetcher = MockBundleFetcher::new();
        fetcher.expect_fetch().returning(move |_| Ok(root.clone()));
        fetcher
    }

    #[test]
    fn test_linux_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("lib/libcudart.so.12"));
        touch(&root.join("lib/libcublas.so.12"));
        touch_executable(&root.join("bin/nvcc"));
        touch(&root.join("nvvm/libdevice/libdevice.10.bc"));
        std::fs::write(root.join(BUNDLE_MANIFEST), r#"{"version": "12.4.131"}"#).unwrap();

        let platform = Platform::new(OsFamily::Linux);
        let fetcher = fetcher_for(root.clone());
        let toolkit = BundleProvisioner::new(&fetcher, &platform)
            .provision(Version::release_of(12, 4))
            .unwrap();

        assert_eq!(toolkit.source, ToolkitSource::Bundle);
        assert_eq!(toolkit.version, Version::new(12, 4, 131));
        assert_eq!(toolkit.prefixes, vec![root.clone()]);
        assert_eq!(
            toolkit.library(ToolkitLibrary::Cudart),
            Some(root.join("lib/libcudart.so.12").as_path())
        );
        assert_eq!(toolkit.library(ToolkitLibrary::Cufft), None);
        assert_eq!(
            toolkit.binary(ToolkitBinary::Nvcc),
            Some(root.join("bin/nvcc").as_path())
        );
        assert_eq!(toolkit.binary(ToolkitBinary::Ptxas), None);
        assert!(toolkit.libdevice.is_some());
        assert_eq!(toolkit.libraries.len(), ToolkitLibrary::iter().count());
    }

    #[test]
    fn test_windows_layout_uses_bin_for_libraries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("bin/cudart64_12.dll"));

        let platform = Platform::new(OsFamily::Windows);
        let fetcher = fetcher_for(root.clone());
        let toolkit = BundleProvisioner::new(&fetcher, &platform)
            .provision(Version::release_of(12, 1))
            .unwrap();

        assert_eq!(
            toolkit.library(ToolkitLibrary::Cudart),
            Some(root.join("bin/cudart64_12.dll").as_path())
        );
        assert_eq!(toolkit.version, Version::release_of(12, 1));
    }

    #[test]
    fn test_manifest_release_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(BUNDLE_MANIFEST), r#"{"version": "11.8.89"}"#).unwrap();

        let platform = Platform::new(OsFamily::Linux);
        let fetcher = fetcher_for(dir.path().to_path_buf());
        let err = BundleProvisioner::new(&fetcher, &platform)
            .provision(Version::release_of(12, 0))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Manifest { .. }));
    }

    #[test]
    fn test_malformed_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(BUNDLE_MANIFEST), "not json").unwrap();
        assert!(matches!(
            read_manifest(dir.path()),
            Err(ProvisionError::Manifest { .. })
        ));
    }

    #[test]
    fn test_fetch_failure_propagates() {
        let mut fetcher = MockBundleFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|artifact| Err(ProvisionError::unavailable(artifact, "offline")));

        let platform = Platform::new(OsFamily::Linux);
        let err = BundleProvisioner::new(&fetcher, &platform)
            .provision(Version::release_of(12, 4))
            .unwrap_err();
        assert!(err.to_string().contains("cuda-12.4"));
    }

    #[test]
    fn test_optional_bundle_reports_target_release() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("lib/libcudnn.so.9"));
        std::fs::write(
            root.join(BUNDLE_MANIFEST),
            r#"{"version": "9.1.0", "target_release": "12.2"}"#,
        )
        .unwrap();

        let mut fetcher = MockBundleFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|artifact| artifact.slug() == "cudnn-12.4")
            .returning(move |_| Ok(root.clone()));

        let platform = Platform::new(OsFamily::Linux);
        let info = BundleProvisioner::new(&fetcher, &platform)
            .provision_optional(OptionalLibrary::Cudnn, Version::new(12, 4, 131))
            .unwrap();
        assert_eq!(info.source, ToolkitSource::Bundle);
        assert_eq!(info.target_release, Some(Version::release_of(12, 2)));
    }

    #[test]
    fn test_optional_bundle_without_library_file() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Platform::new(OsFamily::Linux);
        let fetcher = fetcher_for(dir.path().to_path_buf());
        let err = BundleProvisioner::new(&fetcher, &platform)
            .provision_optional(OptionalLibrary::Cutensor, Version::release_of(12, 4))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Unavailable { .. }));
    }
}
