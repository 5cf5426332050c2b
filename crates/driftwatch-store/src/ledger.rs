//! Alert ledger trait and retention policy.
//!
//! The ledger answers a single question for the alert gate: should this
//! fingerprint produce a new outbound alert? Retention (how long a
//! fingerprint suppresses repeats) is the ledger's concern, not the gate's.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;

/// Result type for ledger operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// How long a recorded fingerprint suppresses repeated alerts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionPolicy {
    /// Re-alert for a fingerprint last alerted longer ago than this.
    /// `None` deduplicates forever.
    pub realert_after: Option<chrono::Duration>,
}

impl RetentionPolicy {
    /// Whether a fingerprint last alerted at `last` should alert again at `now`.
    pub fn expired(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.realert_after {
            Some(window) => now - last >= window,
            None => false,
        }
    }
}

/// Persistent record of which drift fingerprints have already alerted.
///
/// Guarantees:
/// - `should_alert` returns `true` for a never-seen fingerprint.
/// - After `record_alert(fp, at)`, `should_alert(fp)` returns `false` until
///   the backend's retention policy expires the record.
#[async_trait]
pub trait AlertLedger: Send + Sync {
    /// Whether this fingerprint should produce a new alert.
    async fn should_alert(&self, fingerprint: &str) -> StoreResult<bool>;

    /// Record that an alert was delivered for this fingerprint at `at`.
    async fn record_alert(&self, fingerprint: &str, at: DateTime<Utc>) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_window_never_expires() {
        let policy = RetentionPolicy::default();
        let last = Utc::now() - chrono::Duration::days(365);
        assert!(!policy.expired(last, Utc::now()));
    }

    #[test]
    fn window_expires_old_records() {
        let policy = RetentionPolicy {
            realert_after: Some(chrono::Duration::hours(24)),
        };
        let now = Utc::now();
        assert!(policy.expired(now - chrono::Duration::hours(25), now));
        assert!(!policy.expired(now - chrono::Duration::hours(23), now));
    }
}
