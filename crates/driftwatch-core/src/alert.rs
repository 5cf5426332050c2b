//! Alert gating and webhook delivery.
//!
//! A drift fingerprint identifies "this particular drift condition":
//! status plus the three pending counts. Repeated runs producing the same
//! condition collapse to a single outbound alert via the dedup ledger.
//! Alerting is defined only for drift; clean and failed runs never alert.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use driftwatch_store::AlertLedger;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{DriftError, Result};
use crate::metrics::{PlanMetrics, PlanStatus};
use crate::report::render_summary;

/// Fingerprint of a drift condition: SHA-256 over status and pending counts.
pub fn fingerprint(metrics: &PlanMetrics) -> String {
    let mut hasher = Sha256::new();
    hasher.update(metrics.status.label().as_bytes());
    hasher.update(b"\0");
    for count in [
        metrics.pending_add,
        metrics.pending_change,
        metrics.pending_destroy,
    ] {
        hasher.update(count.to_be_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Outbound alert delivery target.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Slack incoming-webhook sink.
pub struct SlackWebhook {
    http: reqwest::Client,
    url: String,
}

impl SlackWebhook {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl AlertSink for SlackWebhook {
    async fn send(&self, text: &str) -> Result<()> {
        let payload = serde_json::json!({ "text": text, "link_names": 1 });
        self.http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| DriftError::Sink(format!("webhook post: {e}")))?;
        Ok(())
    }
}

/// Decides whether a classified run produces a new alert and dispatches it.
pub struct AlertGate {
    ledger: Arc<dyn AlertLedger>,
    sink: Arc<dyn AlertSink>,
}

impl AlertGate {
    pub fn new(ledger: Arc<dyn AlertLedger>, sink: Arc<dyn AlertSink>) -> Self {
        Self { ledger, sink }
    }

    /// Process one run's metrics. Returns whether an alert was dispatched.
    ///
    /// The fingerprint is recorded only after successful delivery, so a
    /// failed webhook post is retried on the next run instead of being
    /// silently dropped forever.
    pub async fn process(&self, metrics: &PlanMetrics) -> Result<bool> {
        if metrics.status != PlanStatus::Drift {
            debug!(status = metrics.status.label(), "no alert: status is not drift");
            return Ok(false);
        }

        let fp = fingerprint(metrics);
        let should = self
            .ledger
            .should_alert(&fp)
            .await
            .map_err(|e| DriftError::Sink(format!("dedup ledger: {e}")))?;

        if !should {
            info!(fingerprint = %fp, "alert suppressed: drift condition already alerted");
            return Ok(false);
        }

        self.sink.send(&render_summary(metrics)).await?;

        self.ledger
            .record_alert(&fp, Utc::now())
            .await
            .map_err(|e| DriftError::Sink(format!("dedup ledger: {e}")))?;

        info!(fingerprint = %fp, "alert dispatched");
        Ok(true)
    }
}
