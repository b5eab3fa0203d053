//! NVIDIA driver adapters.
//!
//! The driver is probed through `nvidia-smi`, whose banner carries both the
//! driver version and the newest CUDA release it supports. When the tool is
//! missing we fall back to looking for the user-mode driver library, which
//! proves a driver is installed but says nothing about its ceiling.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock, OnceLock};
use std::time::Duration;

use cuprobe_core::{
    DriverPort, EnvSource, LibraryLoader, OsFamily, Platform, Readiness, RuntimeBinderPort,
    Searcher, Version,
};
use regex::Regex;
use tracing::debug;

use crate::command::run_captured;

static CUDA_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"CUDA Version\s*:\s*(\d+)\.(\d+)").expect("static pattern")
});

static DRIVER_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Driver Version\s*:\s*([0-9.]+)").expect("static pattern")
});

/// What `nvidia-smi` told us.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SmiReport {
    pub driver_version: Option<String>,
    pub cuda_ceiling: Option<Version>,
}

/// Parse the `nvidia-smi` banner.
pub fn parse_smi_output(output: &str) -> SmiReport {
    let cuda_ceiling = CUDA_VERSION.captures(output).and_then(|c| {
        let major = c.get(1)?.as_str().parse().ok()?;
        let minor = c.get(2)?.as_str().parse().ok()?;
        Some(Version::release_of(major, minor))
    });
    let driver_version = DRIVER_VERSION
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    SmiReport {
        driver_version,
        cuda_ceiling,
    }
}

#[derive(Debug, Clone)]
struct DriverInfo {
    readiness: Readiness,
    ceiling: Option<Version>,
}

/// [`DriverPort`] backed by `nvidia-smi` and the driver library.
///
/// The probe runs once; both port methods read the cached result.
pub struct NvidiaDriver {
    platform: Platform,
    env: Arc<dyn EnvSource>,
    timeout: Duration,
    info: OnceLock<DriverInfo>,
}

impl NvidiaDriver {
    pub fn new(platform: Platform, env: Arc<dyn EnvSource>, timeout: Duration) -> Self {
        Self {
            platform,
            env,
            timeout,
            info: OnceLock::new(),
        }
    }

    fn info(&self) -> &DriverInfo {
        self.info.get_or_init(|| self.probe())
    }

    fn probe(&self) -> DriverInfo {
        if let Some(smi) = self.find_smi() {
            match run_captured(&smi, &[], self.timeout) {
                Ok(output) => {
                    let report = parse_smi_output(&output);
                    if report.driver_version.is_some() || report.cuda_ceiling.is_some() {
                        debug!(
                            driver = ?report.driver_version,
                            ceiling = ?report.cuda_ceiling.map(Version::release_string),
                            "probed NVIDIA driver"
                        );
                        return DriverInfo {
                            readiness: Readiness::Ready,
                            ceiling: report.cuda_ceiling,
                        };
                    }
                    debug!(output = %output.trim(), "nvidia-smi reported no driver");
                }
                Err(e) => debug!(error = %e, "nvidia-smi failed"),
            }
        }

        let searcher = Searcher::new(&self.platform, self.env.as_ref());
        match searcher.find_library(self.platform.driver_library_names(), &[]) {
            Ok(path) => {
                debug!(path = %path.display(), "found driver library without nvidia-smi");
                DriverInfo {
                    readiness: Readiness::Ready,
                    ceiling: None,
                }
            }
            Err(_) => DriverInfo {
                readiness: Readiness::unavailable("no NVIDIA driver found"),
                ceiling: None,
            },
        }
    }

    fn find_smi(&self) -> Option<PathBuf> {
        let searcher = Searcher::new(&self.platform, self.env.as_ref());
        let mut prefixes = Vec::new();
        if self.platform.family() == OsFamily::Windows {
            let program_files = self
                .env
                .var("ProgramFiles")
                .unwrap_or_else(|| "C:\\Program Files".to_string());
            prefixes.push(PathBuf::from(program_files).join("NVIDIA Corporation").join("NVSMI"));
        }
        searcher.find_binary("nvidia-smi", &prefixes).ok()
    }
}

impl DriverPort for NvidiaDriver {
    fn status(&self) -> Readiness {
        self.info().readiness.clone()
    }

    fn max_supported_release(&self) -> Option<Version> {
        self.info().ceiling
    }
}

/// [`RuntimeBinderPort`] that checks the driver's user-mode library can be
/// located and passes the loader.
pub struct DriverLibraryBinder {
    platform: Platform,
    env: Arc<dyn EnvSource>,
    loader: Arc<dyn LibraryLoader>,
}

impl DriverLibraryBinder {
    pub fn new(
        platform: Platform,
        env: Arc<dyn EnvSource>,
        loader: Arc<dyn LibraryLoader>,
    ) -> Self {
        Self {
            platform,
            env,
            loader,
        }
    }
}

impl RuntimeBinderPort for DriverLibraryBinder {
    fn status(&self) -> Readiness {
        let searcher = Searcher::new(&self.platform, self.env.as_ref());
        let path = match searcher.find_library(self.platform.driver_library_names(), &[]) {
            Ok(path) => path,
            Err(e) => return Readiness::unavailable(format!("driver library not found ({e})")),
        };

        match self.loader.load(&path) {
            Ok(()) => Readiness::Ready,
            Err(e) => Readiness::unavailable(e.to_string()),
        }
    }
}
