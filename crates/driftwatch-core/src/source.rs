//! Configuration source fetching.
//!
//! Resolves the current head commit of the hosted Terraform repository and
//! materializes a commit-pinned working copy on disk. Working copies are
//! keyed by `(repository, commit)`: if the path for the current head already
//! exists it is reused with no network access, so repeated runs against an
//! unchanged branch fetch nothing.

use std::path::PathBuf;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{DriftError, Result};
use crate::fetch::ArtifactFetcher;
use crate::install::unpack_zip;

const DEFAULT_API_BASE: &str = "https://api.github.com";

const AGENT: &str = "driftwatch (Terraform drift monitor)";

#[derive(Debug, Deserialize)]
struct BranchInfo {
    commit: CommitRef,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
}

/// Fetches commit-pinned working copies of the configuration repository.
pub struct SourceFetcher {
    http: reqwest::Client,
    repo: String,
    branch: String,
    token: String,
    tmp_dir: PathBuf,
    api_base: String,
}

impl SourceFetcher {
    pub fn new(
        http: reqwest::Client,
        repo: impl Into<String>,
        branch: impl Into<String>,
        token: impl Into<String>,
        tmp_dir: PathBuf,
    ) -> Self {
        Self {
            http,
            repo: repo.into(),
            branch: branch.into(),
            token: token.into(),
            tmp_dir,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Override the hosting API root (tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Deterministic working-copy path for a commit.
    pub fn working_copy_path(&self, sha: &str) -> PathBuf {
        let repo_name = self.repo.replace('/', "-");
        self.tmp_dir.join("repo").join(format!("{repo_name}-{sha}"))
    }

    /// Query the hosting API for the branch's current head commit.
    pub async fn head_commit(&self) -> Result<String> {
        let url = format!(
            "{}/repos/{}/branches/{}",
            self.api_base, self.repo, self.branch
        );
        info!(repo = %self.repo, branch = %self.branch, "querying branch head");

        let body = self
            .http
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let info: BranchInfo = serde_json::from_str(&body)
            .map_err(|e| DriftError::Parse(format!("branch response for {url}: {e}")))?;

        debug!(sha = %info.commit.sha, "resolved head commit");
        Ok(info.commit.sha)
    }

    /// Materialize a working copy of the branch's current head.
    ///
    /// Same commit, same working copy: an existing path is reused as
    /// cache-valid regardless of elapsed time.
    pub async fn fetch_head(&self, fetcher: &ArtifactFetcher) -> Result<PathBuf> {
        let sha = self.head_commit().await?;
        let working_copy = self.working_copy_path(&sha);

        if working_copy.is_dir() {
            info!(path = %working_copy.display(), "working copy already materialized, skipping download");
            return Ok(working_copy);
        }

        let archive = self.tmp_dir.join("repo.zip");
        let url = format!("{}/repos/{}/zipball/{sha}", self.api_base, self.repo);

        debug!(url, "downloading source archive");
        fetcher
            .download(&url, &archive, self.auth_headers()?)
            .await?;

        let out_dir = self.tmp_dir.join("repo");
        tokio::fs::create_dir_all(&out_dir)
            .await
            .map_err(|e| DriftError::Fetch(format!("mkdir {}: {e}", out_dir.display())))?;

        unpack_zip(&archive, &out_dir).await?;

        if !working_copy.is_dir() {
            return Err(DriftError::Fetch(format!(
                "archive for {sha} did not contain expected root {}",
                working_copy.display()
            )));
        }

        Ok(working_copy)
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("token {}", self.token))
                .map_err(|e| DriftError::Parse(format!("invalid token header: {e}")))?,
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(AGENT));
        Ok(headers)
    }
}
