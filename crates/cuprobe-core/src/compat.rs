//! Static compatibility data.
//!
//! Two tables drive selection: the toolkit releases available as bundles,
//! and the newest host compiler each toolkit release accepts.
//! Source: <https://docs.nvidia.com/cuda/cuda-installation-guide-linux/#host-compiler-support-policy>

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ports::VersionQuery;
use crate::version::Version;

/// Toolkit releases published as pre-packaged bundles.
pub const BUNDLED_RELEASES: &[Version] = &[
    Version::release_of(11, 4),
    Version::release_of(11, 5),
    Version::release_of(11, 6),
    Version::release_of(11, 7),
    Version::release_of(11, 8),
    Version::release_of(12, 0),
    Version::release_of(12, 1),
    Version::release_of(12, 2),
    Version::release_of(12, 3),
    Version::release_of(12, 4),
    Version::release_of(12, 5),
    Version::release_of(12, 6),
];

/// Host compiler families with distinct compatibility rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerFamily {
    Gcc,
    Clang,
    Msvc,
}

impl CompilerFamily {
    /// Reduce a version to the precision the support table uses.
    ///
    /// GCC and Clang are gated on the major version, MSVC on `19.xx`.
    pub const fn truncate(self, version: Version) -> Version {
        match self {
            Self::Gcc | Self::Clang => Version::new(version.major, 0, 0),
            Self::Msvc => version.release(),
        }
    }

    /// How to ask a compiler of this family for its version.
    pub fn version_query(self) -> VersionQuery {
        match self {
            Self::Gcc | Self::Clang => VersionQuery::compiler(),
            Self::Msvc => VersionQuery::msvc(),
        }
    }

    fn bounds(self) -> &'static [(Version, Version)] {
        match self {
            Self::Gcc => GCC_BOUNDS,
            Self::Clang => CLANG_BOUNDS,
            Self::Msvc => MSVC_BOUNDS,
        }
    }

    /// Newest compiler version (truncated) supported by `toolkit`.
    ///
    /// Uses the newest table entry not newer than the toolkit's release, so
    /// toolkit point releases inherit the bound of their series. Returns
    /// `None` for toolkits older than the table.
    pub fn max_supported(self, toolkit: Version) -> Option<Version> {
        let release = toolkit.release();
        self.bounds()
            .iter()
            .rev()
            .find(|(since, _)| *since <= release)
            .map(|(_, bound)| *bound)
    }

    /// Whether `compiler` may be used with `toolkit`.
    pub fn supports(self, toolkit: Version, compiler: Version) -> bool {
        self.max_supported(toolkit)
            .is_some_and(|bound| self.truncate(compiler) <= bound)
    }
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gcc => "GCC",
            Self::Clang => "Clang",
            Self::Msvc => "MSVC",
        };
        f.write_str(name)
    }
}

/// (first toolkit release, newest supported compiler)
const GCC_BOUNDS: &[(Version, Version)] = &[
    (Version::release_of(10, 0), Version::new(7, 0, 0)),
    (Version::release_of(10, 1), Version::new(8, 0, 0)),
    (Version::release_of(11, 0), Version::new(9, 0, 0)),
    (Version::release_of(11, 1), Version::new(10, 0, 0)),
    (Version::release_of(11, 4), Version::new(11, 0, 0)),
    (Version::release_of(12, 0), Version::new(12, 0, 0)),
    (Version::release_of(12, 4), Version::new(13, 0, 0)),
    (Version::release_of(12, 8), Version::new(14, 0, 0)),
];

const CLANG_BOUNDS: &[(Version, Version)] = &[
    (Version::release_of(10, 0), Version::new(6, 0, 0)),
    (Version::release_of(10, 1), Version::new(8, 0, 0)),
    (Version::release_of(11, 0), Version::new(9, 0, 0)),
    (Version::release_of(11, 1), Version::new(10, 0, 0)),
    (Version::release_of(11, 4), Version::new(12, 0, 0)),
    (Version::release_of(11, 6), Version::new(13, 0, 0)),
    (Version::release_of(12, 0), Version::new(14, 0, 0)),
    (Version::release_of(12, 1), Version::new(15, 0, 0)),
    (Version::release_of(12, 3), Version::new(16, 0, 0)),
    (Version::release_of(12, 4), Version::new(17, 0, 0)),
    (Version::release_of(12, 6), Version::new(18, 0, 0)),
    (Version::release_of(12, 8), Version::new(19, 0, 0)),
];

const MSVC_BOUNDS: &[(Version, Version)] = &[
    (Version::release_of(10, 0), Version::release_of(19, 16)),
    (Version::release_of(10, 1), Version::release_of(19, 24)),
    (Version::release_of(11, 0), Version::release_of(19, 27)),
    (Version::release_of(11, 4), Version::release_of(19, 29)),
    (Version::release_of(12, 0), Version::release_of(19, 34)),
    (Version::release_of(12, 4), Version::release_of(19, 39)),
    (Version::release_of(12, 5), Version::release_of(19, 40)),
    (Version::release_of(12, 8), Version::release_of(19, 42)),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_releases_are_sorted_and_unique() {
        assert!(BUNDLED_RELEASES.windows(2).all(|w| w[0] < w[1]));
        assert!(BUNDLED_RELEASES.iter().all(|v| v.patch == 0));
    }

    #[test]
    fn test_gcc_bounds_follow_release_series() {
        let gcc = CompilerFamily::Gcc;
        assert_eq!(gcc.max_supported(Version::new(11, 8, 89)), Some(Version::new(11, 0, 0)));
        assert_eq!(gcc.max_supported(Version::new(12, 2, 0)), Some(Version::new(12, 0, 0)));
        assert_eq!(gcc.max_supported(Version::new(12, 4, 131)), Some(Version::new(13, 0, 0)));
        assert_eq!(gcc.max_supported(Version::new(9, 2, 0)), None);
    }

    #[test]
    fn test_supports_compares_at_family_precision() {
        let toolkit = Version::new(12, 2, 140);
        assert!(CompilerFamily::Gcc.supports(toolkit, Version::new(12, 3, 0)));
        assert!(!CompilerFamily::Gcc.supports(toolkit, Version::new(13, 1, 0)));

        let toolkit = Version::release_of(12, 4);
        assert!(CompilerFamily::Msvc.supports(toolkit, Version::new(19, 39, 33523)));
        assert!(!CompilerFamily::Msvc.supports(toolkit, Version::new(19, 40, 33811)));
    }

    #[test]
    fn test_newer_toolkits_inherit_newest_bound() {
        assert_eq!(
            CompilerFamily::Clang.max_supported(Version::release_of(13, 0)),
            Some(Version::new(19, 0, 0))
        );
    }
}
