//! Error types for driftwatch-store

use thiserror::Error;

/// Errors that can occur in the alert ledger layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database connection or open error
    #[error("Ledger connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Ledger query failed: {0}")]
    Query(String),

    /// Schema setup error
    #[error("Ledger schema setup failed: {0}")]
    SchemaSetup(String),

    /// Stored timestamp could not be parsed
    #[error("Invalid stored timestamp: {0}")]
    InvalidTimestamp(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}
