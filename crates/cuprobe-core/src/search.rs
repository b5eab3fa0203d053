//! Locating binaries and shared libraries.
//!
//! A search builds an ordered list of locations (each prefix, then its
//! conventional subdirectories, then the environment's search path) and
//! probes every acceptable name in each location before moving on. The
//! first hit wins, so an explicit prefix always beats `PATH` or the linker
//! defaults even when both contain a match.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::trace;

use crate::env::EnvSource;
use crate::platform::Platform;

/// A search that matched nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("none of {names:?} found in {} searched location(s)", searched.len())]
pub struct SearchError {
    /// Names that were accepted.
    pub names: Vec<String>,
    /// Locations that were probed, in order.
    pub searched: Vec<PathBuf>,
}

/// Binary and library search over a platform and an environment.
#[derive(Clone, Copy)]
pub struct Searcher<'a> {
    platform: &'a Platform,
    env: &'a dyn EnvSource,
}

impl<'a> Searcher<'a> {
    pub fn new(platform: &'a Platform, env: &'a dyn EnvSource) -> Self {
        Self { platform, env }
    }

    pub const fn platform(&self) -> &'a Platform {
        self.platform
    }

    pub fn env(&self) -> &'a dyn EnvSource {
        self.env
    }

    /// Locations probed for a library, in priority order.
    pub fn library_locations(&self, prefixes: &[PathBuf]) -> Vec<PathBuf> {
        let mut locations = expand_prefixes(prefixes, self.platform.library_subdirs());
        locations.extend(self.platform.linker_search_path(self.env));
        dedupe_paths(locations)
    }

    /// Locations probed for a binary, in priority order.
    pub fn binary_locations(&self, prefixes: &[PathBuf], include_path: bool) -> Vec<PathBuf> {
        let mut locations = expand_prefixes(prefixes, self.platform.binary_subdirs());
        if include_path {
            locations.extend(self.platform.executable_search_path(self.env));
        }
        dedupe_paths(locations)
    }

    /// Find the first library matching any of `names`.
    ///
    /// The caller supplies fully decorated file names (see
    /// [`Platform::library_file_names`]). The result is the canonical path
    /// of the file with symlinks resolved, so later loads bind to a fully
    /// qualified object regardless of linker environment variables.
    pub fn find_library<S: AsRef<str>>(
        &self,
        names: &[S],
        prefixes: &[PathBuf],
    ) -> Result<PathBuf, SearchError> {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        let locations = self.library_locations(prefixes);

        match probe(&locations, &names, is_library_file) {
            Some(hit) => Ok(std::fs::canonicalize(&hit).unwrap_or(hit)),
            None => Err(SearchError {
                names,
                searched: locations,
            }),
        }
    }

    /// Find a binary under `prefixes`, falling back to `PATH`.
    pub fn find_binary(&self, name: &str, prefixes: &[PathBuf]) -> Result<PathBuf, SearchError> {
        self.find_binary_impl(name, prefixes, true)
    }

    /// Find a binary under `prefixes` only.
    pub fn find_binary_under(
        &self,
        name: &str,
        prefixes: &[PathBuf],
    ) -> Result<PathBuf, SearchError> {
        self.find_binary_impl(name, prefixes, false)
    }

    fn find_binary_impl(
        &self,
        name: &str,
        prefixes: &[PathBuf],
        include_path: bool,
    ) -> Result<PathBuf, SearchError> {
        let names = vec![self.platform.executable_name(name)];
        let locations = self.binary_locations(prefixes, include_path);

        probe(&locations, &names, is_executable_file).ok_or(SearchError {
            names,
            searched: locations,
        })
    }
}

/// Each prefix followed by its subdirectories.
fn expand_prefixes(prefixes: &[PathBuf], subdirs: &[&str]) -> Vec<PathBuf> {
    let mut locations = Vec::with_capacity(prefixes.len() * (subdirs.len() + 1));
    for prefix in prefixes {
        locations.push(prefix.clone());
        for subdir in subdirs {
            locations.push(prefix.join(subdir));
        }
    }
    locations
}

fn probe(locations: &[PathBuf], names: &[String], accept: fn(&Path) -> bool) -> Option<PathBuf> {
    for location in locations {
        for name in names {
            let candidate = location.join(name);
            if accept(&candidate) {
                trace!(path = %candidate.display(), "search hit");
                return Some(candidate);
            }
        }
    }
    None
}

/// Remove duplicate paths while keeping the first occurrence.
pub(crate) fn dedupe_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

fn is_library_file(path: &Path) -> bool {
    path.is_file()
}

fn is_executable_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        true
    }
}

/// Strip a trailing `bin`, `lib` or `lib64` segment to get an install root.
pub fn install_root_of(file: &Path) -> Option<PathBuf> {
    let dir = file.parent()?;
    match dir.file_name().and_then(|n| n.to_str()) {
        Some("bin" | "lib" | "lib64") => dir.parent().map(Path::to_path_buf),
        _ => Some(dir.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnv;
    use crate::platform::OsFamily;
    use crate::test_support::{touch, touch_executable};

    fn linux() -> Platform {
        Platform::new(OsFamily::Linux)
            .with_linker_dirs(Vec::new())
            .with_toolkit_roots(Vec::new())
    }

    #[test]
    fn test_binary_prefix_beats_path() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("toolkit");
        let on_path = dir.path().join("elsewhere");
        touch_executable(&prefix.join("bin/nvcc"));
        touch_executable(&on_path.join("nvcc"));

        let platform = linux();
        let env = MapEnv::new().with("PATH", on_path.to_string_lossy());
        let searcher = Searcher::new(&platform, &env);

        let found = searcher.find_binary("nvcc", &[prefix.clone()]).unwrap();
        assert_eq!(found, prefix.join("bin/nvcc"));

        let found = searcher.find_binary("nvcc", &[]).unwrap();
        assert_eq!(found, on_path.join("nvcc"));
    }

    #[test]
    fn test_binary_under_ignores_path() {
        let dir = tempfile::tempdir().unwrap();
        touch_executable(&dir.path().join("nvcc"));

        let platform = linux();
        let env = MapEnv::new().with("PATH", dir.path().to_string_lossy());
        let searcher = Searcher::new(&platform, &env);

        let err = searcher
            .find_binary_under("nvcc", &[dir.path().join("missing")])
            .unwrap_err();
        assert_eq!(err.names, vec!["nvcc".to_string()]);
        assert_eq!(err.searched.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_file_is_not_a_binary() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("bin/ptxas"));

        let platform = linux();
        let env = MapEnv::new();
        let searcher = Searcher::new(&platform, &env);
        assert!(searcher.find_binary("ptxas", &[dir.path().to_path_buf()]).is_err());
    }

    #[test]
    fn test_library_location_order() {
        let platform = Platform::new(OsFamily::Linux).with_linker_dirs(vec!["/usr/lib".into()]);
        let env = MapEnv::new().with("LD_LIBRARY_PATH", "/ld");
        let searcher = Searcher::new(&platform, &env);

        let locations = searcher.library_locations(&["/p".into(), "/q".into()]);
        let expected: Vec<PathBuf> = [
            "/p", "/p/lib", "/p/lib64", "/q", "/q/lib", "/q/lib64", "/ld", "/usr/lib",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(locations, expected);
    }

    #[test]
    fn test_library_resolves_symlinks_and_respects_priority() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cuda");
        let real = root.join("lib64/libcudart.so.12.4.127");
        touch(&real);
        let fallback = dir.path().join("ld");
        touch(&fallback.join("libcudart.so.12"));

        #[cfg(unix)]
        std::os::unix::fs::symlink(&real, root.join("lib64/libcudart.so.12")).unwrap();
        #[cfg(not(unix))]
        touch(&root.join("lib64/libcudart.so.12"));

        let platform = linux();
        let env = MapEnv::new().with("LD_LIBRARY_PATH", fallback.to_string_lossy());
        let searcher = Searcher::new(&platform, &env);

        let found = searcher
            .find_library(&["libcudart.so.12"], &[root.clone()])
            .unwrap();
        #[cfg(unix)]
        assert_eq!(found, std::fs::canonicalize(&real).unwrap());
        assert!(found.starts_with(std::fs::canonicalize(&root).unwrap()));

        let found = searcher.find_library(&["libcudart.so.12"], &[]).unwrap();
        assert!(found.starts_with(std::fs::canonicalize(&fallback).unwrap()));
    }

    #[test]
    fn test_search_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a/lib/libcufft.so"));
        touch(&dir.path().join("b/libcufft.so"));

        let platform = linux();
        let env = MapEnv::new();
        let searcher = Searcher::new(&platform, &env);
        let prefixes = vec![dir.path().join("a"), dir.path().join("b")];

        let first = searcher.find_library(&["libcufft.so"], &prefixes).unwrap();
        for _ in 0..5 {
            assert_eq!(searcher.find_library(&["libcufft.so"], &prefixes).unwrap(), first);
        }
        assert!(first.ends_with("a/lib/libcufft.so"));
    }

    #[test]
    fn test_names_are_tried_in_each_location_before_moving_on() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("first/libnvrtc.so"));
        touch(&dir.path().join("second/libnvrtc.so.12"));

        let platform = linux();
        let env = MapEnv::new();
        let searcher = Searcher::new(&platform, &env);
        let prefixes = vec![dir.path().join("first"), dir.path().join("second")];

        let found = searcher
            .find_library(&["libnvrtc.so.12", "libnvrtc.so"], &prefixes)
            .unwrap();
        assert!(found.ends_with("first/libnvrtc.so"));
    }

    #[test]
    fn test_install_root_of_strips_known_segments() {
        assert_eq!(
            install_root_of(Path::new("/usr/local/cuda/bin/nvcc")),
            Some(PathBuf::from("/usr/local/cuda"))
        );
        assert_eq!(
            install_root_of(Path::new("/opt/cuda/lib64/libcudart.so")),
            Some(PathBuf::from("/opt/cuda"))
        );
        assert_eq!(
            install_root_of(Path::new("/tools/nvcc")),
            Some(PathBuf::from("/tools"))
        );
    }
}
