//! Durable SQLite alert ledger.
//!
//! One table maps a drift fingerprint to the time its alert was last
//! delivered. Timestamps are stored as RFC 3339 text. WAL journal mode and
//! a busy timeout keep concurrent scheduled invocations from corrupting or
//! blocking each other.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::StoreError;
use crate::ledger::{AlertLedger, RetentionPolicy, StoreResult};

/// Busy timeout applied to the connection (ms).
const BUSY_TIMEOUT_MS: i64 = 5_000;

/// SQLite-backed alert ledger.
///
/// Queries are short single-row lookups, so they run synchronously under a
/// mutex rather than on a blocking thread pool.
pub struct SqliteAlertLedger {
    conn: Mutex<Connection>,
    retention: RetentionPolicy,
}

impl SqliteAlertLedger {
    /// Open (creating if needed) the ledger database at `path`.
    pub fn open(path: &Path, retention: RetentionPolicy) -> StoreResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Connection(format!("open {}: {e}", path.display())))?;

        conn.pragma_update(None, "journal_mode", "wal")
            .map_err(|e| StoreError::SchemaSetup(e.to_string()))?;
        conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS)
            .map_err(|e| StoreError::SchemaSetup(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS alert_fingerprints (
                fingerprint     TEXT PRIMARY KEY,
                last_alerted_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::SchemaSetup(e.to_string()))?;

        debug!(path = %path.display(), "opened sqlite alert ledger");

        Ok(Self {
            conn: Mutex::new(conn),
            retention,
        })
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Connection("ledger mutex poisoned".to_string()))
    }
}

#[async_trait]
impl AlertLedger for SqliteAlertLedger {
    async fn should_alert(&self, fingerprint: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        let stored: Option<String> = conn
            .query_row(
                "SELECT last_alerted_at FROM alert_fingerprints WHERE fingerprint = ?1",
                params![fingerprint],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            None => Ok(true),
            Some(text) => {
                let last = DateTime::parse_from_rfc3339(&text)
                    .map_err(|e| StoreError::InvalidTimestamp(format!("{text}: {e}")))?
                    .with_timezone(&Utc);
                Ok(self.retention.expired(last, Utc::now()))
            }
        }
    }

    async fn record_alert(&self, fingerprint: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO alert_fingerprints (fingerprint, last_alerted_at)
             VALUES (?1, ?2)
             ON CONFLICT(fingerprint) DO UPDATE SET last_alerted_at = ?2",
            params![fingerprint, at.to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp(retention: RetentionPolicy) -> (tempfile::TempDir, SqliteAlertLedger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SqliteAlertLedger::open(&dir.path().join("alerts.db"), retention).unwrap();
        (dir, ledger)
    }

    #[tokio::test]
    async fn unseen_fingerprint_alerts() {
        let (_dir, ledger) = open_temp(RetentionPolicy::default());
        assert!(ledger.should_alert("fp1").await.unwrap());
    }

    #[tokio::test]
    async fn recorded_fingerprint_is_suppressed() {
        let (_dir, ledger) = open_temp(RetentionPolicy::default());
        ledger.record_alert("fp1", Utc::now()).await.unwrap();
        assert!(!ledger.should_alert("fp1").await.unwrap());
        assert!(ledger.should_alert("fp2").await.unwrap());
    }

    #[tokio::test]
    async fn record_is_durable_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.db");
        {
            let ledger = SqliteAlertLedger::open(&path, RetentionPolicy::default()).unwrap();
            ledger.record_alert("fp1", Utc::now()).await.unwrap();
        }
        let reopened = SqliteAlertLedger::open(&path, RetentionPolicy::default()).unwrap();
        assert!(!reopened.should_alert("fp1").await.unwrap());
    }

    #[tokio::test]
    async fn retention_window_allows_realert() {
        let (_dir, ledger) = open_temp(RetentionPolicy {
            realert_after: Some(chrono::Duration::hours(1)),
        });
        ledger
            .record_alert("fp1", Utc::now() - chrono::Duration::hours(2))
            .await
            .unwrap();
        assert!(ledger.should_alert("fp1").await.unwrap());
    }

    #[tokio::test]
    async fn record_alert_upserts() {
        let (_dir, ledger) = open_temp(RetentionPolicy {
            realert_after: Some(chrono::Duration::hours(1)),
        });
        ledger
            .record_alert("fp1", Utc::now() - chrono::Duration::hours(2))
            .await
            .unwrap();
        ledger.record_alert("fp1", Utc::now()).await.unwrap();
        assert!(!ledger.should_alert("fp1").await.unwrap());
    }
}
