//! Resolved toolkit description.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::library::{OptionalLibrary, ToolkitBinary, ToolkitLibrary};
use crate::version::Version;

/// Where a toolkit or library came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolkitSource {
    /// A pre-packaged bundle with a fixed layout.
    Bundle,
    /// An unmanaged local installation.
    Local,
}

impl fmt::Display for ToolkitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bundle => f.write_str("bundle"),
            Self::Local => f.write_str("local"),
        }
    }
}

/// A version that resolution may try, with where it would come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolkitCandidate {
    pub version: Version,
    pub source: ToolkitSource,
}

/// The toolkit chosen for this process.
///
/// Library and binary maps always contain every enum variant; a `None`
/// value means the file is absent from this toolkit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedToolkit {
    pub source: ToolkitSource,
    pub version: Version,
    /// Install prefixes, most relevant first.
    pub prefixes: Vec<PathBuf>,
    pub libraries: BTreeMap<ToolkitLibrary, Option<PathBuf>>,
    pub binaries: BTreeMap<ToolkitBinary, Option<PathBuf>>,
    /// Device-library bitcode used by compilers targeting the device.
    pub libdevice: Option<PathBuf>,
}

impl ResolvedToolkit {
    pub fn release(&self) -> Version {
        self.version.release()
    }

    pub fn library(&self, lib: ToolkitLibrary) -> Option<&Path> {
        self.libraries.get(&lib).and_then(Option::as_deref)
    }

    pub fn binary(&self, bin: ToolkitBinary) -> Option<&Path> {
        self.binaries.get(&bin).and_then(Option::as_deref)
    }

    /// Libraries that were not found.
    pub fn missing_libraries(&self) -> Vec<ToolkitLibrary> {
        self.libraries
            .iter()
            .filter(|(_, path)| path.is_none())
            .map(|(lib, _)| *lib)
            .collect()
    }
}

/// A present optional library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalLibraryInfo {
    pub library: OptionalLibrary,
    pub path: PathBuf,
    pub source: ToolkitSource,
    /// Toolkit release the library was built against, when it says so.
    pub target_release: Option<Version>,
}

/// `bundle.json` at the root of a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleManifest {
    /// Full version of the bundled artifact.
    pub version: Option<Version>,
    /// Toolkit release an auxiliary-library bundle targets.
    pub target_release: Option<Version>,
}

/// File name of the bundle manifest.
pub const BUNDLE_MANIFEST: &str = "bundle.json";
