//! Artifact retrieval: local files, S3 objects, and streamed HTTP downloads.

use std::path::Path;

use futures::StreamExt;
use reqwest::header::HeaderMap;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{DriftError, Result};

/// Fetches byte blobs by URI scheme and streams HTTP payloads to disk.
///
/// `s3://bucket/key` URIs go through the S3 client when one is configured;
/// anything else is treated as a local filesystem path.
pub struct ArtifactFetcher {
    http: reqwest::Client,
    s3: Option<aws_sdk_s3::Client>,
}

impl ArtifactFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http, s3: None }
    }

    /// Enable `s3://` URI support.
    pub fn with_s3(mut self, s3: aws_sdk_s3::Client) -> Self {
        self.s3 = Some(s3);
        self
    }

    /// Fetch the full contents of a local path or `s3://` object.
    pub async fn fetch(&self, uri: &str) -> Result<Vec<u8>> {
        debug!(uri, "fetching artifact");

        if uri.to_lowercase().starts_with("s3://") {
            let (bucket, key) = parse_s3_uri(uri)?;
            let s3 = self.s3.as_ref().ok_or_else(|| {
                DriftError::Fetch(format!("s3 support not configured for {uri}"))
            })?;

            let object = s3
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| DriftError::Fetch(format!("s3 get {uri}: {e}")))?;

            let body = object
                .body
                .collect()
                .await
                .map_err(|e| DriftError::Fetch(format!("s3 read {uri}: {e}")))?;

            return Ok(body.into_bytes().to_vec());
        }

        tokio::fs::read(uri)
            .await
            .map_err(|e| DriftError::Fetch(format!("read {uri}: {e}")))
    }

    /// Stream an HTTP GET response to `dest` in bounded chunks, overwriting
    /// any existing file. The payload is never held in memory at once.
    pub async fn download(&self, url: &str, dest: &Path, headers: HeaderMap) -> Result<()> {
        debug!(url, dest = %dest.display(), "downloading");

        let response = self
            .http
            .get(url)
            .headers(headers)
            .send()
            .await?
            .error_for_status()?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| DriftError::Fetch(format!("create {}: {e}", dest.display())))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| DriftError::Fetch(format!("write {}: {e}", dest.display())))?;
        }

        file.flush()
            .await
            .map_err(|e| DriftError::Fetch(format!("flush {}: {e}", dest.display())))?;

        Ok(())
    }
}

/// Split `s3://bucket/key` into its bucket and key parts.
fn parse_s3_uri(uri: &str) -> Result<(String, String)> {
    let rest = uri
        .get(5..)
        .filter(|_| uri.to_lowercase().starts_with("s3://"))
        .ok_or_else(|| DriftError::Parse(format!("not an s3 uri: {uri}")))?;

    match rest.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
            Ok((bucket.to_string(), key.to_string()))
        }
        _ => Err(DriftError::Parse(format!("malformed s3 uri: {uri}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_s3_uri_splits_bucket_and_key() {
        let (bucket, key) = parse_s3_uri("s3://state-bucket/env/terraform.tfstate").unwrap();
        assert_eq!(bucket, "state-bucket");
        assert_eq!(key, "env/terraform.tfstate");
    }

    #[test]
    fn parse_s3_uri_rejects_missing_key() {
        assert!(parse_s3_uri("s3://bucket-only").is_err());
        assert!(parse_s3_uri("s3://bucket/").is_err());
        assert!(parse_s3_uri("s3:///key").is_err());
    }

    #[tokio::test]
    async fn fetch_reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"{\"ok\":true}").await.unwrap();

        let fetcher = ArtifactFetcher::new(reqwest::Client::new());
        let bytes = fetcher.fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, b"{\"ok\":true}");
    }

    #[tokio::test]
    async fn fetch_s3_without_client_fails() {
        let fetcher = ArtifactFetcher::new(reqwest::Client::new());
        let result = fetcher.fetch("s3://bucket/key").await;
        assert!(matches!(result, Err(DriftError::Fetch(_))));
    }

    #[tokio::test]
    async fn download_streams_to_disk_and_overwrites() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let handle = std::thread::spawn(move || {
            let request = server.recv().unwrap();
            let response = tiny_http::Response::from_string("payload-bytes");
            request.respond(response).unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("artifact.bin");
        tokio::fs::write(&dest, b"stale contents that must be replaced")
            .await
            .unwrap();

        let fetcher = ArtifactFetcher::new(reqwest::Client::new());
        fetcher
            .download(
                &format!("http://127.0.0.1:{port}/artifact"),
                &dest,
                HeaderMap::new(),
            )
            .await
            .unwrap();

        handle.join().unwrap();
        let written = tokio::fs::read(&dest).await.unwrap();
        assert_eq!(written, b"payload-bytes");
    }

    #[tokio::test]
    async fn download_propagates_http_errors() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let handle = std::thread::spawn(move || {
            let request = server.recv().unwrap();
            let response = tiny_http::Response::from_string("missing").with_status_code(404);
            request.respond(response).unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let fetcher = ArtifactFetcher::new(reqwest::Client::new());
        let result = fetcher
            .download(
                &format!("http://127.0.0.1:{port}/missing"),
                &dir.path().join("out"),
                HeaderMap::new(),
            )
            .await;

        handle.join().unwrap();
        assert!(matches!(result, Err(DriftError::Fetch(_))));
    }
}
