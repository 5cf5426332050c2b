//! In-memory alert ledger.
//!
//! Satisfies the [`AlertLedger`] contract without external dependencies.
//! Used as the `memory` backend (dedup within one process lifetime only)
//! and as the fake in tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::ledger::{AlertLedger, RetentionPolicy, StoreResult};

/// In-memory alert ledger backed by a `HashMap<fingerprint, last_alerted_at>`.
#[derive(Debug, Default)]
pub struct MemoryAlertLedger {
    records: Mutex<HashMap<String, DateTime<Utc>>>,
    retention: RetentionPolicy,
}

impl MemoryAlertLedger {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            retention,
        }
    }

    /// Number of recorded fingerprints (test helper).
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AlertLedger for MemoryAlertLedger {
    async fn should_alert(&self, fingerprint: &str) -> StoreResult<bool> {
        let records = self.records.lock().unwrap();
        Ok(match records.get(fingerprint) {
            Some(last) => self.retention.expired(*last, Utc::now()),
            None => true,
        })
    }

    async fn record_alert(&self, fingerprint: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let mut records = self.records.lock().unwrap();
        records.insert(fingerprint.to_string(), at);
        Ok(())
    }
}
