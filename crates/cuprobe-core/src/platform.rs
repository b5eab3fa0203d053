//! Platform capabilities used by discovery.
//!
//! All OS-specific knowledge lives here: file name decoration, executable
//! suffixes, conventional install roots, linker search directories and the
//! host compilers worth probing. The resolution algorithms only ever ask a
//! [`Platform`] value, so they can be exercised for any OS family from any
//! host.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compat::CompilerFamily;
use crate::env::EnvSource;
use crate::version::Version;

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    Windows,
    MacOs,
}

impl OsFamily {
    /// Family of the host this binary was compiled for.
    pub const fn host() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }

    /// Tag used in artifact file names.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::MacOs => "macos",
        }
    }
}

/// Naming and layout conventions for one OS family.
///
/// Default roots and linker directories can be replaced, which keeps tests
/// hermetic on machines that do have a toolkit installed.
#[derive(Debug, Clone)]
pub struct Platform {
    family: OsFamily,
    toolkit_roots: Option<Vec<PathBuf>>,
    linker_dirs: Option<Vec<PathBuf>>,
}

impl Platform {
    pub const fn new(family: OsFamily) -> Self {
        Self {
            family,
            toolkit_roots: None,
            linker_dirs: None,
        }
    }

    pub const fn host() -> Self {
        Self::new(OsFamily::host())
    }

    /// Replace the conventional toolkit install roots.
    #[must_use]
    pub fn with_toolkit_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.toolkit_roots = Some(roots);
        self
    }

    /// Replace the dynamic linker's default directories.
    #[must_use]
    pub fn with_linker_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.linker_dirs = Some(dirs);
        self
    }

    pub const fn family(&self) -> OsFamily {
        self.family
    }

    pub const fn exe_suffix(&self) -> &'static str {
        match self.family {
            OsFamily::Windows => ".exe",
            _ => "",
        }
    }

    /// `nvcc` → `nvcc.exe` on Windows; names that already carry the suffix
    /// are left alone.
    pub fn executable_name(&self, stem: &str) -> String {
        let suffix = self.exe_suffix();
        if suffix.is_empty() || stem.to_ascii_lowercase().ends_with(suffix) {
            stem.to_string()
        } else {
            format!("{stem}{suffix}")
        }
    }

    /// Subdirectories of a prefix that may hold shared libraries.
    pub const fn library_subdirs(&self) -> &'static [&'static str] {
        match self.family {
            OsFamily::Windows => &["bin", "lib", "lib64"],
            _ => &["lib", "lib64"],
        }
    }

    /// Subdirectories of a prefix that may hold executables.
    pub const fn binary_subdirs(&self) -> &'static [&'static str] {
        &["bin"]
    }

    pub const fn path_list_separator(&self) -> char {
        match self.family {
            OsFamily::Windows => ';',
            _ => ':',
        }
    }

    /// Split a `PATH`-style list using this family's separator.
    pub fn split_path_list(&self, value: &str) -> Vec<PathBuf> {
        value
            .split(self.path_list_separator())
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(PathBuf::from)
            .collect()
    }

    /// Entries of the executable search path.
    pub fn executable_search_path(&self, env: &dyn EnvSource) -> Vec<PathBuf> {
        env.var("PATH")
            .map(|value| self.split_path_list(&value))
            .unwrap_or_default()
    }

    /// Variable the dynamic linker consults before its defaults.
    pub const fn linker_path_var(&self) -> &'static str {
        match self.family {
            OsFamily::Linux => "LD_LIBRARY_PATH",
            OsFamily::MacOs => "DYLD_LIBRARY_PATH",
            OsFamily::Windows => "PATH",
        }
    }

    /// Directories the dynamic linker would search, in its order.
    pub fn linker_search_path(&self, env: &dyn EnvSource) -> Vec<PathBuf> {
        let mut dirs = env
            .var(self.linker_path_var())
            .map(|value| self.split_path_list(&value))
            .unwrap_or_default();
        dirs.extend(self.linker_default_dirs(env));
        dirs
    }

    fn linker_default_dirs(&self, env: &dyn EnvSource) -> Vec<PathBuf> {
        if let Some(dirs) = &self.linker_dirs {
            return dirs.clone();
        }

        match self.family {
            OsFamily::Linux => {
                let multiarch = format!("/usr/lib/{}-linux-gnu", std::env::consts::ARCH);
                vec![
                    PathBuf::from("/usr/lib/wsl/lib"),
                    PathBuf::from(multiarch),
                    PathBuf::from("/usr/lib64"),
                    PathBuf::from("/lib64"),
                    PathBuf::from("/usr/lib"),
                    PathBuf::from("/lib"),
                    PathBuf::from("/usr/local/lib"),
                ]
            }
            OsFamily::MacOs => vec![PathBuf::from("/usr/local/lib"), PathBuf::from("/usr/lib")],
            OsFamily::Windows => env
                .var("SystemRoot")
                .map(|root| vec![Path::new(&root).join("System32")])
                .unwrap_or_default(),
        }
    }

    /// Conventional toolkit install roots, most preferred first.
    ///
    /// Versioned directories (`/usr/local/cuda-12.4`, `...\CUDA\v12.4`) are
    /// expanded newest first. Roots are not checked for existence here.
    pub fn conventional_toolkit_roots(&self, env: &dyn EnvSource) -> Vec<PathBuf> {
        if let Some(roots) = &self.toolkit_roots {
            return roots.clone();
        }

        match self.family {
            OsFamily::Linux => {
                let mut roots = vec![PathBuf::from("/usr/local/cuda")];
                roots.extend(versioned_children(Path::new("/usr/local"), "cuda-"));
                roots.push(PathBuf::from("/opt/cuda"));
                roots
            }
            OsFamily::MacOs => {
                let mut roots = versioned_children(Path::new("/Developer/NVIDIA"), "CUDA-");
                roots.push(PathBuf::from("/usr/local/cuda"));
                roots
            }
            OsFamily::Windows => {
                let program_files = env
                    .var("ProgramFiles")
                    .unwrap_or_else(|| "C:\\Program Files".to_string());
                let parent = Path::new(&program_files)
                    .join("NVIDIA GPU Computing Toolkit")
                    .join("CUDA");
                versioned_children(&parent, "v")
            }
        }
    }

    /// Candidate file names for a library in a local installation, most
    /// specific first.
    pub fn library_file_names(&self, stem: &str, release: Option<Version>) -> Vec<String> {
        let mut names = Vec::new();
        match self.family {
            OsFamily::Linux => {
                if let Some(v) = release {
                    names.push(format!("lib{stem}.so.{}.{}", v.major, v.minor));
                    names.push(format!("lib{stem}.so.{}", v.major));
                }
                names.push(format!("lib{stem}.so"));
            }
            OsFamily::MacOs => {
                if let Some(v) = release {
                    names.push(format!("lib{stem}.{}.{}.dylib", v.major, v.minor));
                    names.push(format!("lib{stem}.{}.dylib", v.major));
                }
                names.push(format!("lib{stem}.dylib"));
            }
            OsFamily::Windows => {
                if let Some(v) = release {
                    names.push(format!("{stem}64_{}{}.dll", v.major, v.minor));
                    names.push(format!("{stem}64_{}.dll", v.major));
                    names.push(format!("{stem}64_{}0.dll", v.major));
                }
                names.push(format!("{stem}.dll"));
            }
        }
        names
    }

    /// The single file name a bundle uses for a library.
    pub fn bundle_library_file(&self, stem: &str, release: Version) -> String {
        match self.family {
            OsFamily::Linux => format!("lib{stem}.so.{}", release.major),
            OsFamily::MacOs => format!("lib{stem}.{}.dylib", release.major),
            OsFamily::Windows => format!("{stem}64_{}.dll", release.major),
        }
    }

    /// Bundle subdirectory holding libraries.
    pub const fn bundle_library_dir(&self) -> &'static str {
        match self.family {
            OsFamily::Windows => "bin",
            _ => "lib",
        }
    }

    /// File names of the user-mode driver library.
    pub const fn driver_library_names(&self) -> &'static [&'static str] {
        match self.family {
            OsFamily::Linux => &["libcuda.so.1", "libcuda.so"],
            OsFamily::MacOs => &["libcuda.dylib"],
            OsFamily::Windows => &["nvcuda.dll"],
        }
    }

    /// Host compilers worth probing, in enumeration order.
    ///
    /// Linux distributions ship several side-by-side GCC and Clang versions
    /// under suffixed names; other platforms have one canonical compiler.
    pub fn host_compilers(&self) -> Vec<(CompilerFamily, String)> {
        match self.family {
            OsFamily::Linux => {
                let mut candidates = vec![(CompilerFamily::Gcc, "gcc".to_string())];
                candidates.extend(
                    (5..=15)
                        .rev()
                        .map(|n| (CompilerFamily::Gcc, format!("gcc-{n}"))),
                );
                candidates.push((CompilerFamily::Clang, "clang".to_string()));
                candidates
                    .extend((7..=19).rev().map(|n| (CompilerFamily::Clang, format!("clang-{n}"))));
                candidates
            }
            OsFamily::MacOs => vec![(CompilerFamily::Clang, "clang".to_string())],
            OsFamily::Windows => vec![(CompilerFamily::Msvc, "cl".to_string())],
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::host()
    }
}

/// Children of `parent` named `<prefix><version>`, newest version first.
fn versioned_children(parent: &Path, prefix: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(parent) else {
        return Vec::new();
    };

    let mut found: Vec<(Version, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let version = name.strip_prefix(prefix)?.parse::<Version>().ok()?;
            Some((version, entry.path()))
        })
        .collect();

    found.sort_by(|a, b| b.0.cmp(&a.0));
    found.into_iter().map(|(_, path)| path).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnv;

    #[test]
    fn test_library_names_per_family() {
        let v = Some(Version::new(12, 4, 131));
        assert_eq!(
            Platform::new(OsFamily::Linux).library_file_names("cudart", v),
            vec!["libcudart.so.12.4", "libcudart.so.12", "libcudart.so"]
        );
        assert_eq!(
            Platform::new(OsFamily::Windows).library_file_names("cublas", v),
            vec!["cublas64_124.dll", "cublas64_12.dll", "cublas64_120.dll", "cublas.dll"]
        );
        assert_eq!(
            Platform::new(OsFamily::MacOs).library_file_names("cufft", None),
            vec!["libcufft.dylib"]
        );
    }

    #[test]
    fn test_bundle_layout_names() {
        let release = Version::release_of(11, 8);
        let linux = Platform::new(OsFamily::Linux);
        let windows = Platform::new(OsFamily::Windows);
        assert_eq!(linux.bundle_library_file("nvrtc", release), "libnvrtc.so.11");
        assert_eq!(linux.bundle_library_dir(), "lib");
        assert_eq!(windows.bundle_library_file("nvrtc", release), "nvrtc64_11.dll");
        assert_eq!(windows.bundle_library_dir(), "bin");
    }

    #[test]
    fn test_executable_name_suffix() {
        let windows = Platform::new(OsFamily::Windows);
        assert_eq!(windows.executable_name("nvcc"), "nvcc.exe");
        assert_eq!(windows.executable_name("nvcc.EXE"), "nvcc.EXE");
        assert_eq!(Platform::new(OsFamily::Linux).executable_name("nvcc"), "nvcc");
    }

    #[test]
    fn test_linker_search_path_puts_env_first() {
        let platform = Platform::new(OsFamily::Linux).with_linker_dirs(vec!["/usr/lib".into()]);
        let env = MapEnv::new().with("LD_LIBRARY_PATH", "/a::/b");
        assert_eq!(
            platform.linker_search_path(&env),
            vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/usr/lib")]
        );
    }

    #[test]
    fn test_windows_path_list_uses_semicolons() {
        let platform = Platform::new(OsFamily::Windows);
        let env = MapEnv::new().with("PATH", "C:\\cuda\\bin;C:\\Windows");
        assert_eq!(platform.executable_search_path(&env).len(), 2);
    }

    #[test]
    fn test_versioned_children_sorted_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["cuda-11.8", "cuda-12.4", "cuda-12.10", "cuda-notes", "other"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        let found = versioned_children(dir.path(), "cuda-");
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cuda-12.10", "cuda-12.4", "cuda-11.8"]);
    }

    #[test]
    fn test_linux_compiler_candidates_include_versioned_names() {
        let candidates = Platform::new(OsFamily::Linux).host_compilers();
        assert_eq!(candidates[0], (CompilerFamily::Gcc, "gcc".to_string()));
        assert!(candidates.contains(&(CompilerFamily::Gcc, "gcc-12".to_string())));
        assert!(candidates.contains(&(CompilerFamily::Clang, "clang-17".to_string())));
        assert_eq!(
            Platform::new(OsFamily::Windows).host_compilers(),
            vec![(CompilerFamily::Msvc, "cl".to_string())]
        );
    }
}
