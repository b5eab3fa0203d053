//! Command handlers.
//!
//! Each handler takes the composed [`cuprobe_core::Discovery`], triggers
//! resolution through its accessors and formats the result for the
//! terminal. Formatting lives in pure `render` functions so it can be
//! tested without probing the host.

pub mod compiler;
pub mod library;
pub mod paths;
pub mod status;
pub mod versions;

use std::path::Path;

/// `<missing>` for absent paths.
pub(crate) fn display_path(path: Option<&Path>) -> String {
    path.map_or_else(|| "<missing>".to_string(), |p| p.display().to_string())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use cuprobe_core::{
        OptionalLibrary, OptionalLibraryInfo, Resolution, ResolvedToolkit, ToolkitBinary,
        ToolkitLibrary, ToolkitSource, Version,
    };

    /// A local 12.2 toolkit under `/opt/cuda` with cudart, nvcc and cuDNN.
    pub fn resolution() -> Resolution {
        let root = PathBuf::from("/opt/cuda");
        let mut libraries = BTreeMap::new();
        libraries.insert(ToolkitLibrary::Cudart, Some(root.join("lib64/libcudart.so.12")));
        libraries.insert(ToolkitLibrary::Cublas, None);
        let mut binaries = BTreeMap::new();
        binaries.insert(ToolkitBinary::Nvcc, Some(root.join("bin/nvcc")));
        binaries.insert(ToolkitBinary::Ptxas, None);

        let mut optional = BTreeMap::new();
        optional.insert(
            OptionalLibrary::Cudnn,
            Some(OptionalLibraryInfo {
                library: OptionalLibrary::Cudnn,
                path: root.join("lib64/libcudnn.so.9"),
                source: ToolkitSource::Local,
                target_release: None,
            }),
        );
        optional.insert(OptionalLibrary::Cutensor, None);

        Resolution {
            toolkit: ResolvedToolkit {
                source: ToolkitSource::Local,
                version: Version::new(12, 2, 140),
                prefixes: vec![root.clone()],
                libraries,
                binaries,
                libdevice: Some(root.join("nvvm/libdevice/libdevice.10.bc")),
            },
            optional,
            driver_ceiling: Some(Version::release_of(12, 4)),
            warnings: Vec::new(),
        }
    }
}
