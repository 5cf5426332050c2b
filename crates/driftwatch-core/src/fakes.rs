//! In-memory fakes for the reporting and alerting sinks (testing only)
//!
//! These satisfy the sink contracts without any network access; failure
//! injection covers the "sink errors are logged, not fatal" paths.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::alert::AlertSink;
use crate::error::{DriftError, Result};
use crate::metrics::PlanMetrics;
use crate::report::MetricsSink;

/// In-memory metrics sink that records every published record.
#[derive(Debug, Default)]
pub struct MemoryMetricsSink {
    published: Mutex<Vec<PlanMetrics>>,
    fail: bool,
}

impl MemoryMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every publish fails.
    pub fn failing() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn published(&self) -> Vec<PlanMetrics> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsSink for MemoryMetricsSink {
    async fn publish(&self, metrics: &PlanMetrics) -> Result<()> {
        if self.fail {
            return Err(DriftError::Sink("injected metrics failure".to_string()));
        }
        self.published.lock().unwrap().push(metrics.clone());
        Ok(())
    }
}

/// In-memory alert sink that records every sent message.
#[derive(Debug, Default)]
pub struct MemoryAlertSink {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every send fails.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for MemoryAlertSink {
    async fn send(&self, text: &str) -> Result<()> {
        if self.fail {
            return Err(DriftError::Sink("injected alert failure".to_string()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
