//! Metrics reporting: human-readable summary plus an optional metrics sink.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::metrics::{PlanMetrics, PlanStatus};

/// Delivery target for numeric plan metrics (resource count, pending
/// counts, duration). Backends decide naming and transport.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn publish(&self, metrics: &PlanMetrics) -> Result<()>;
}

/// Render the three-line run summary:
///
/// ```text
/// Drift detected!
/// Pending: Add=2, Change=1, Destroy=0, Total=3
/// Plan took 1 minute, 12 seconds.
/// ```
///
/// The `Failed` status is reported by the pipeline separately and never
/// reaches this formatter.
pub fn render_summary(metrics: &PlanMetrics) -> String {
    let headline = match metrics.status {
        PlanStatus::Drift => "Drift detected!",
        _ => "No changes detected.",
    };

    let pending = format!(
        "Pending: Add={}, Change={}, Destroy={}, Total={}",
        metrics.pending_add, metrics.pending_change, metrics.pending_destroy, metrics.pending_total
    );

    let timing = format!("Plan took {}.", human_duration(metrics.plan_duration));

    format!("{headline}\n{pending}\n{timing}")
}

/// Coarse human breakdown of a duration, zero-valued units omitted.
///
/// Years and months use fixed 365-day and 30-day approximations; plan
/// durations are minutes at worst, so the larger units exist only for
/// pathological cases.
fn human_duration(duration: Duration) -> String {
    const UNITS: &[(&str, u64)] = &[
        ("year", 365 * 24 * 3600),
        ("month", 30 * 24 * 3600),
        ("day", 24 * 3600),
        ("hour", 3600),
        ("minute", 60),
        ("second", 1),
    ];

    let mut remaining = duration.as_secs();
    let mut parts = Vec::new();

    for (name, secs) in UNITS {
        let count = remaining / secs;
        if count > 0 {
            remaining %= secs;
            let suffix = if count == 1 { "" } else { "s" };
            parts.push(format!("{count} {name}{suffix}"));
        }
    }

    let millis = duration.subsec_millis() as u64;
    if millis > 0 {
        let suffix = if millis == 1 { "" } else { "s" };
        parts.push(format!("{millis} millisecond{suffix}"));
    }

    if parts.is_empty() {
        return "0 seconds".to_string();
    }
    parts.join(", ")
}

/// Writes the summary to the log sink unconditionally and forwards numeric
/// fields to a metrics sink when one is configured. Sink failures are
/// logged, never fatal: metrics already exist, and one sink failing must
/// not silence the other.
#[derive(Default)]
pub struct Reporter {
    sink: Option<Arc<dyn MetricsSink>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub async fn report(&self, metrics: &PlanMetrics) {
        match metrics.status {
            PlanStatus::Failed => {
                warn!("terraform plan failed; no drift counts were parsed");
            }
            _ => {
                info!("{}", render_summary(metrics));
            }
        }

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.publish(metrics).await {
                error!(error = %e, "metrics sink delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryMetricsSink;

    fn drift_metrics() -> PlanMetrics {
        PlanMetrics::new(PlanStatus::Drift, 3, 2, 1, 0, Duration::from_secs(72))
    }

    #[test]
    fn summary_has_three_lines_in_fixed_order() {
        let summary = render_summary(&drift_metrics());
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Drift detected!");
        assert_eq!(lines[1], "Pending: Add=2, Change=1, Destroy=0, Total=3");
        assert_eq!(lines[2], "Plan took 1 minute, 12 seconds.");
    }

    #[test]
    fn clean_summary_uses_no_change_headline() {
        let metrics = PlanMetrics::new(PlanStatus::Clean, 5, 0, 0, 0, Duration::from_secs(3));
        let summary = render_summary(&metrics);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "No changes detected.");
        assert_eq!(lines[1], "Pending: Add=0, Change=0, Destroy=0, Total=0");
    }

    #[test]
    fn human_duration_omits_zero_units() {
        assert_eq!(human_duration(Duration::from_secs(62)), "1 minute, 2 seconds");
        assert_eq!(human_duration(Duration::from_secs(3600)), "1 hour");
        assert_eq!(
            human_duration(Duration::from_secs(90061)),
            "1 day, 1 hour, 1 minute, 1 second"
        );
    }

    #[test]
    fn human_duration_handles_fractions_and_zero() {
        assert_eq!(human_duration(Duration::from_millis(340)), "340 milliseconds");
        assert_eq!(
            human_duration(Duration::from_millis(2001)),
            "2 seconds, 1 millisecond"
        );
        assert_eq!(human_duration(Duration::ZERO), "0 seconds");
    }

    #[tokio::test]
    async fn reporter_forwards_to_configured_sink() {
        let sink = Arc::new(MemoryMetricsSink::new());
        let reporter = Reporter::new().with_sink(sink.clone());
        reporter.report(&drift_metrics()).await;
        assert_eq!(sink.published(), vec![drift_metrics()]);
    }

    #[tokio::test]
    async fn reporter_without_sink_still_reports() {
        let reporter = Reporter::new();
        reporter.report(&drift_metrics()).await;
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() {
        let sink = Arc::new(MemoryMetricsSink::failing());
        let reporter = Reporter::new().with_sink(sink.clone());
        reporter.report(&drift_metrics()).await;
        assert!(sink.published().is_empty());
    }
}
