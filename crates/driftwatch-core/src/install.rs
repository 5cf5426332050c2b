//! Terraform binary installation.
//!
//! Derives the release URL and local paths deterministically from the
//! version string (one fixed platform target) and always downloads and
//! unpacks fresh — there is no existing-binary short-circuit, so every run
//! installs the exact version its remote state pins.

use std::path::{Path, PathBuf};

use reqwest::header::HeaderMap;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{DriftError, Result};
use crate::fetch::ArtifactFetcher;

/// HashiCorp release distribution root.
const DEFAULT_RELEASES_BASE: &str = "https://releases.hashicorp.com";

/// The single platform target this pipeline installs.
const PLATFORM: &str = "linux_amd64";

/// Downloads and unpacks a pinned Terraform release.
pub struct ToolInstaller {
    tmp_dir: PathBuf,
    releases_base: String,
}

impl ToolInstaller {
    pub fn new(tmp_dir: PathBuf) -> Self {
        Self {
            tmp_dir,
            releases_base: DEFAULT_RELEASES_BASE.to_string(),
        }
    }

    /// Override the release distribution root (tests).
    pub fn with_releases_base(mut self, base: impl Into<String>) -> Self {
        self.releases_base = base.into();
        self
    }

    /// Release archive URL for a version.
    pub fn release_url(&self, version: &str) -> String {
        format!(
            "{}/terraform/{version}/terraform_{version}_{PLATFORM}.zip",
            self.releases_base
        )
    }

    /// Local archive path for a version.
    pub fn archive_path(&self, version: &str) -> PathBuf {
        self.tmp_dir
            .join(format!("terraform_{version}_{PLATFORM}.zip"))
    }

    /// Local unpack directory for a version.
    pub fn unpack_dir(&self, version: &str) -> PathBuf {
        self.tmp_dir.join(format!("terraform_{version}_{PLATFORM}"))
    }

    /// Download and unpack the release, returning the binary path.
    pub async fn install(&self, fetcher: &ArtifactFetcher, version: &str) -> Result<PathBuf> {
        info!(version, "installing terraform");

        let url = self.release_url(version);
        let archive = self.archive_path(version);
        let out_dir = self.unpack_dir(version);

        debug!(url, "downloading terraform release");
        fetcher
            .download(&url, &archive, HeaderMap::new())
            .await
            .map_err(|e| DriftError::Install(format!("download {url}: {e}")))?;

        tokio::fs::create_dir_all(&out_dir)
            .await
            .map_err(|e| DriftError::Install(format!("mkdir {}: {e}", out_dir.display())))?;

        unpack_zip(&archive, &out_dir).await?;

        Ok(out_dir.join("terraform"))
    }
}

/// Unpack a zip archive with `unzip -o`, overwriting existing entries.
pub(crate) async fn unpack_zip(archive: &Path, dest: &Path) -> Result<()> {
    debug!(archive = %archive.display(), dest = %dest.display(), "unpacking archive");

    let output = Command::new("unzip")
        .arg("-o")
        .arg(archive)
        .arg("-d")
        .arg(dest)
        .output()
        .await
        .map_err(|e| DriftError::Install(format!("failed to run unzip: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DriftError::Install(format!(
            "unzip {} failed: {stderr}",
            archive.display()
        )));
    }

    Ok(())
}
