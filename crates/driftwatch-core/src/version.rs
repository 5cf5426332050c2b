//! Terraform version resolution from the remote state descriptor.

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{DriftError, Result};
use crate::fetch::ArtifactFetcher;

/// The fields of a Terraform remote state file this pipeline cares about.
#[derive(Debug, Deserialize)]
struct RemoteState {
    terraform_version: String,
}

/// Resolve the Terraform version pinned in the remote state at `state_uri`
/// (an `s3://bucket/key` locator or a local path).
///
/// Malformed or missing data is fatal; there is no fallback version.
pub async fn resolve_tool_version(fetcher: &ArtifactFetcher, state_uri: &str) -> Result<String> {
    info!(state_uri, "resolving terraform version from remote state");

    let bytes = fetcher.fetch(state_uri).await?;
    let state: RemoteState = serde_json::from_slice(&bytes)
        .map_err(|e| DriftError::Parse(format!("remote state {state_uri}: {e}")))?;

    debug!(version = %state.terraform_version, "resolved terraform version");
    Ok(state.terraform_version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_version_from_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terraform.tfstate");
        tokio::fs::write(
            &path,
            br#"{"version": 4, "terraform_version": "1.5.7", "resources": []}"#,
        )
        .await
        .unwrap();

        let fetcher = ArtifactFetcher::new(reqwest::Client::new());
        let version = resolve_tool_version(&fetcher, path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(version, "1.5.7");
    }

    #[tokio::test]
    async fn missing_version_field_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terraform.tfstate");
        tokio::fs::write(&path, br#"{"version": 4}"#).await.unwrap();

        let fetcher = ArtifactFetcher::new(reqwest::Client::new());
        let result = resolve_tool_version(&fetcher, path.to_str().unwrap()).await;
        assert!(matches!(result, Err(DriftError::Parse(_))));
    }

    #[tokio::test]
    async fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terraform.tfstate");
        tokio::fs::write(&path, b"not json at all").await.unwrap();

        let fetcher = ArtifactFetcher::new(reqwest::Client::new());
        let result = resolve_tool_version(&fetcher, path.to_str().unwrap()).await;
        assert!(matches!(result, Err(DriftError::Parse(_))));
    }
}
