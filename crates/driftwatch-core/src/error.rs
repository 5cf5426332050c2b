//! Error taxonomy for the drift-detection pipeline.
//!
//! Fetch, Parse, and Install errors are fatal: they abort the run before any
//! metrics exist. A `terraform plan` exiting 1 is NOT an error here — it is
//! the `Failed` classification outcome. Execution covers subprocess launch
//! failures and timeouts. Sink errors are caught and logged by the reporter
//! and alert gate; they never abort a run.

use thiserror::Error;

/// Errors that can occur in the drift-detection pipeline
#[derive(Error, Debug)]
pub enum DriftError {
    /// Network or object-storage retrieval failure
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Malformed state descriptor, API response, or plan output
    #[error("Parse failed: {0}")]
    Parse(String),

    /// Tool download or unpack failure
    #[error("Install failed: {0}")]
    Install(String),

    /// Subprocess launch failure or timeout (distinct from plan exit 1)
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Metrics or alert delivery failure (caught, logged, never fatal)
    #[error("Sink delivery failed: {0}")]
    Sink(String),

    /// Cancellation requested between pipeline stages
    #[error("Run cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for DriftError {
    fn from(err: reqwest::Error) -> Self {
        DriftError::Fetch(err.to_string())
    }
}

impl From<serde_json::Error> for DriftError {
    fn from(err: serde_json::Error) -> Self {
        DriftError::Parse(err.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, DriftError>;
