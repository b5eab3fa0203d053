//! Bundle artifact store.
//!
//! Bundles live unpacked under `<data dir>/artifacts/<name>-<major>.<minor>`.
//! A directory that is already there is returned as is. Otherwise, when a
//! base URL is configured, the platform archive
//! `<url>/<name>-<major>.<minor>-<os>-<arch>.tar.gz` is downloaded into a
//! staging directory next to the cache, unpacked, and renamed into place so
//! a half-written bundle is never visible under its final name.

#[cfg(feature = "cli")]
mod progress;

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use cuprobe_core::{ArtifactId, BundleFetcher, DiscoveryConfig, Platform, ProvisionError};
use flate2::read::GzDecoder;
use tracing::{debug, info, warn};

#[cfg(feature = "cli")]
pub use progress::terminal_progress;

/// Progress callback for bundle downloads.
/// Called with (`artifact`, `downloaded_bytes`, `total_bytes`); the total is
/// 0 when the server did not announce a length.
pub type DownloadProgress = Box<dyn Fn(&ArtifactId, u64, u64) + Send + Sync>;

/// Application directory under the user's data dir.
const APP_DIR: &str = "cuprobe";
const ARTIFACTS_DIR: &str = "artifacts";
const USER_AGENT: &str = concat!("cuprobe/", env!("CARGO_PKG_VERSION"));

/// Default cache root: `CUPROBE_DATA_DIR` when set, else the user's local
/// data directory.
pub fn default_data_dir(config: &DiscoveryConfig) -> Option<PathBuf> {
    config
        .data_dir
        .clone()
        .or_else(|| dirs::data_local_dir().map(|dir| dir.join(APP_DIR)))
}

/// [`BundleFetcher`] backed by a local cache and an optional download URL.
pub struct ArtifactStore {
    cache_dir: PathBuf,
    base_url: Option<String>,
    platform: Platform,
    timeout: Duration,
    progress: Option<DownloadProgress>,
}

impl ArtifactStore {
    pub fn new(data_dir: &Path, platform: Platform) -> Self {
        Self {
            cache_dir: data_dir.join(ARTIFACTS_DIR),
            base_url: None,
            platform,
            timeout: Duration::from_secs(300),
            progress: None,
        }
    }

    /// Build a store from discovery configuration. Without a usable data
    /// directory the store still works, it just never finds anything.
    pub fn from_config(config: &DiscoveryConfig, platform: Platform) -> Self {
        let data_dir = default_data_dir(config).unwrap_or_else(|| PathBuf::from(".").join(APP_DIR));
        Self::new(&data_dir, platform).with_base_url(config.artifact_url.clone())
    }

    #[must_use]
    pub fn with_base_url(mut self, url: Option<String>) -> Self {
        self.base_url = url.map(|u| u.trim_end_matches('/').to_string());
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: DownloadProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where `artifact` lives once unpacked.
    pub fn artifact_dir(&self, artifact: &ArtifactId) -> PathBuf {
        self.cache_dir.join(artifact.slug())
    }

    /// Archive file name for `artifact` on this platform.
    pub fn archive_name(&self, artifact: &ArtifactId) -> String {
        format!(
            "{}-{}-{}.tar.gz",
            artifact.slug(),
            self.platform.family().tag(),
            std::env::consts::ARCH
        )
    }

    fn download(
        &self,
        artifact: &ArtifactId,
        url: &str,
        dest: &Path,
    ) -> Result<(), ProvisionError> {
        let failed = |reason: String| ProvisionError::Download {
            artifact: artifact.clone(),
            reason,
        };

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .map_err(|e| failed(e.to_string()))?;

        let mut response = client.get(url).send().map_err(|e| failed(e.to_string()))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProvisionError::unavailable(artifact, format!("{url} not published")));
        }
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}")));
        }

        let total = response.content_length().unwrap_or(0);
        let mut file = File::create(dest)?;
        let mut buf = vec![0u8; 64 * 1024];
        let mut downloaded: u64 = 0;
        loop {
            let n = response.read(&mut buf).map_err(|e| failed(e.to_string()))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])?;
            downloaded += n as u64;
            if let Some(progress) = &self.progress {
                progress(artifact, downloaded, total);
            }
        }
        file.flush()?;

        if total > 0 && downloaded != total {
            return Err(failed(format!("truncated: got {downloaded} of {total} bytes")));
        }
        debug!(%artifact, bytes = downloaded, "downloaded bundle archive");
        Ok(())
    }

    fn install(&self, artifact: &ArtifactId, url: &str) -> Result<PathBuf, ProvisionError> {
        let target = self.artifact_dir(artifact);
        let staging = self
            .cache_dir
            .join(format!(".{}.partial-{}", artifact.slug(), std::process::id()));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let result = self.stage(artifact, url, &staging).and_then(|root| {
            match fs::rename(&root, &target) {
                Ok(()) => Ok(target.clone()),
                // Another process finished the same bundle first.
                Err(_) if target.is_dir() => Ok(target.clone()),
                Err(e) => Err(ProvisionError::Io(e)),
            }
        });

        if let Err(e) = fs::remove_dir_all(&staging) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(
                    path = %staging.display(),
                    error = %e,
                    "failed to clean up staging directory"
                );
            }
        }
        result
    }

    fn stage(
        &self,
        artifact: &ArtifactId,
        url: &str,
        staging: &Path,
    ) -> Result<PathBuf, ProvisionError> {
        let archive = staging.join("archive.tar.gz");
        self.download(artifact, url, &archive)?;

        let unpacked = staging.join("unpacked");
        let file = File::open(&archive)?;
        unpack_archive(BufReader::new(file), &unpacked).map_err(|e| ProvisionError::Extract {
            artifact: artifact.clone(),
            reason: e.to_string(),
        })?;
        Ok(bundle_root(&unpacked))
    }
}

impl BundleFetcher for ArtifactStore {
    fn fetch(&self, artifact: &ArtifactId) -> Result<PathBuf, ProvisionError> {
        let target = self.artifact_dir(artifact);
        if target.is_dir() {
            debug!(%artifact, path = %target.display(), "bundle already cached");
            return Ok(target);
        }

        let Some(base) = &self.base_url else {
            return Err(ProvisionError::unavailable(
                artifact,
                "not cached and no download URL configured",
            ));
        };

        fs::create_dir_all(&self.cache_dir)?;
        let url = format!("{base}/{}", self.archive_name(artifact));
        info!(%artifact, %url, "downloading bundle");
        let path = self.install(artifact, &url)?;
        info!(%artifact, path = %path.display(), "bundle installed");
        Ok(path)
    }
}

/// Unpack a gzip-compressed tarball into `dest`.
pub fn unpack_archive(reader: impl Read, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    archive.set_preserve_permissions(true);
    archive.unpack(dest)
}

/// Archives may wrap the bundle in a single top-level directory.
fn bundle_root(unpacked: &Path) -> PathBuf {
    let Ok(entries) = fs::read_dir(unpacked) else {
        return unpacked.to_path_buf();
    };
    let entries: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    match entries.as_slice() {
        [only] if only.is_dir() && !is_layout_dir(only) => only.clone(),
        _ => unpacked.to_path_buf(),
    }
}

fn is_layout_dir(path: &Path) -> bool {
    matches!(
        path.file_name().and_then(|n| n.to_str()),
        Some("bin" | "lib" | "nvvm" | "include")
    )
}
