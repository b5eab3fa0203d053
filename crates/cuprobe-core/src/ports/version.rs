//! Version probe port.
//!
//! Asking a tool for its version means running it, which is an adapter
//! concern. Core only defines what to ask ([`VersionQuery`]) and how the
//! answer is parsed.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::version::Version;

static NVCC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"V(\d+)\.(\d+)\.(\d+)").expect("static pattern"));

static COMPILER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("static pattern"));

static MSVC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Version (\d+)\.(\d+)\.(\d+)").expect("static pattern"));

/// How to ask a binary for its version and read the answer.
///
/// The pattern must capture major and minor; a third group (patch) is
/// optional and defaults to zero.
#[derive(Debug, Clone)]
pub struct VersionQuery {
    flag: Option<String>,
    pattern: Regex,
}

impl VersionQuery {
    pub fn new(flag: Option<&str>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            flag: flag.map(str::to_string),
            pattern: Regex::new(pattern)?,
        })
    }

    /// `nvcc --version` / `ptxas --version`:
    /// `Cuda compilation tools, release 12.4, V12.4.131`.
    pub fn nvcc() -> Self {
        Self {
            flag: Some("--version".to_string()),
            pattern: NVCC_PATTERN.clone(),
        }
    }

    /// GCC and Clang `--version`; the first dotted number on the banner.
    pub fn compiler() -> Self {
        Self {
            flag: Some("--version".to_string()),
            pattern: COMPILER_PATTERN.clone(),
        }
    }

    /// MSVC `cl` prints its banner when run without arguments.
    pub fn msvc() -> Self {
        Self {
            flag: None,
            pattern: MSVC_PATTERN.clone(),
        }
    }

    /// Replace the flag, keeping the pattern.
    #[must_use]
    pub fn with_flag(mut self, flag: Option<&str>) -> Self {
        self.flag = flag.map(str::to_string);
        self
    }

    pub fn flag(&self) -> Option<&str> {
        self.flag.as_deref()
    }

    /// Apply the pattern to tool output.
    pub fn extract(&self, output: &str) -> Option<Version> {
        let captures = self.pattern.captures(output)?;
        let group = |i: usize| captures.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

        Some(Version::new(group(1)?, group(2)?, group(3).unwrap_or(0)))
    }
}

/// Why a version could not be obtained.
///
/// `Missing` means "keep searching"; the others mean the tool is present
/// but unusable, which callers treat as much more serious.
#[derive(Debug, Error)]
pub enum VersionError {
    /// The binary does not exist.
    #[error("binary not found: {0}")]
    Missing(PathBuf),

    /// The binary exists but could not be started.
    #[error("failed to run {path}: {reason}")]
    Spawn { path: PathBuf, reason: String },

    /// The binary did not finish in time and was killed.
    #[error("{path} did not report a version within {seconds}s")]
    Timeout { path: PathBuf, seconds: u64 },

    /// The binary ran but its output did not match the pattern.
    #[error("could not parse a version from {path} output: {output:?}")]
    Parse { path: PathBuf, output: String },
}

impl VersionError {
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }
}

/// Port for running a binary and extracting its version.
#[cfg_attr(test, mockall::automock)]
pub trait VersionProbe: Send + Sync {
    fn query(&self, binary: &Path, query: &VersionQuery) -> Result<Version, VersionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nvcc_banner() {
        let output = "nvcc: NVIDIA (R) Cuda compiler driver\n\
                      Copyright (c) 2005-2024 NVIDIA Corporation\n\
                      Cuda compilation tools, release 12.4, V12.4.131\n\
                      Build cuda_12.4.r12.4/compiler.34097967_0";
        assert_eq!(VersionQuery::nvcc().extract(output), Some(Version::new(12, 4, 131)));
    }

    #[test]
    fn test_gcc_banner_skips_binary_name() {
        let output = "gcc-12 (Ubuntu 12.3.0-1ubuntu1~22.04) 12.3.0\nCopyright (C) 2022";
        assert_eq!(
            VersionQuery::compiler().extract(output),
            Some(Version::new(12, 3, 0))
        );
    }

    #[test]
    fn test_clang_banner() {
        let output = "Ubuntu clang version 14.0.0-1ubuntu1.1\nTarget: x86_64-pc-linux-gnu";
        assert_eq!(
            VersionQuery::compiler().extract(output),
            Some(Version::new(14, 0, 0))
        );
    }

    #[test]
    fn test_msvc_banner_has_no_flag() {
        let query = VersionQuery::msvc();
        assert_eq!(query.flag(), None);
        let output = "Microsoft (R) C/C++ Optimizing Compiler Version 19.39.33523 for x64";
        assert_eq!(query.extract(output), Some(Version::new(19, 39, 33523)));
    }

    #[test]
    fn test_two_group_pattern_defaults_patch() {
        let query = VersionQuery::new(Some("-v"), r"release (\d+)\.(\d+)").unwrap();
        assert_eq!(query.extract("release 11.8"), Some(Version::release_of(11, 8)));
        assert_eq!(query.extract("no version here"), None);
    }
}
