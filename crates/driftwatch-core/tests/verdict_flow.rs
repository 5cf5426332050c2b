//! End-to-end flow from raw plan output to report and alert decision,
//! using in-memory sinks and ledger.

use std::sync::Arc;
use std::time::Duration;

use driftwatch_core::fakes::{MemoryAlertSink, MemoryMetricsSink};
use driftwatch_core::{classify, AlertGate, PlanStatus, Reporter};
use driftwatch_store::{MemoryAlertLedger, RetentionPolicy};

const DRIFT_PLAN: &str = "\
aws_vpc.main: Refreshing state... [id=vpc-0a1b]
aws_route53_zone.main: Refreshing state... [id=Z123]
aws_instance.web: Refreshing state... [id=i-0abc]

Terraform will perform the following actions:

  # aws_instance.web will be updated in-place
  ~ resource \"aws_instance\" \"web\" {
        instance_type = \"t3.small\" -> \"t3.medium\"
    }

Plan: 2 to add, 1 to change, 0 to destroy.
";

#[tokio::test]
async fn drift_run_reports_and_alerts_once() {
    let metrics = classify(2, DRIFT_PLAN, Duration::from_secs(42)).unwrap();
    assert_eq!(metrics.status, PlanStatus::Drift);
    assert_eq!(metrics.resource_count, 3);
    assert_eq!(metrics.pending_total, 3);

    let metrics_sink = Arc::new(MemoryMetricsSink::new());
    let reporter = Reporter::new().with_sink(metrics_sink.clone());
    reporter.report(&metrics).await;
    assert_eq!(metrics_sink.published().len(), 1);

    let alert_sink = Arc::new(MemoryAlertSink::new());
    let ledger = Arc::new(MemoryAlertLedger::new(RetentionPolicy::default()));
    let gate = AlertGate::new(ledger, alert_sink.clone());

    // First run alerts; an identical second run is suppressed.
    assert!(gate.process(&metrics).await.unwrap());
    assert!(!gate.process(&metrics).await.unwrap());

    let sent = alert_sink.sent();
    assert_eq!(sent.len(), 1);
    let lines: Vec<&str> = sent[0].lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "Drift detected!");
    assert_eq!(lines[1], "Pending: Add=2, Change=1, Destroy=0, Total=3");
    assert_eq!(lines[2], "Plan took 42 seconds.");
}

#[tokio::test]
async fn clean_run_reports_but_never_alerts() {
    let stdout = "aws_vpc.main: Refreshing state...\n\nNo changes. Infrastructure is up-to-date.\n";
    let metrics = classify(0, stdout, Duration::from_secs(3)).unwrap();
    assert_eq!(metrics.status, PlanStatus::Clean);

    let metrics_sink = Arc::new(MemoryMetricsSink::new());
    Reporter::new()
        .with_sink(metrics_sink.clone())
        .report(&metrics)
        .await;
    assert_eq!(metrics_sink.published().len(), 1);

    let alert_sink = Arc::new(MemoryAlertSink::new());
    let ledger = Arc::new(MemoryAlertLedger::new(RetentionPolicy::default()));
    let gate = AlertGate::new(ledger, alert_sink.clone());
    assert!(!gate.process(&metrics).await.unwrap());
    assert!(alert_sink.sent().is_empty());
}

#[tokio::test]
async fn failed_run_reaches_sink_but_not_alerting() {
    let metrics = classify(1, "Error: provider authentication failed\n", Duration::from_secs(1))
        .unwrap();
    assert_eq!(metrics.status, PlanStatus::Failed);

    let metrics_sink = Arc::new(MemoryMetricsSink::new());
    Reporter::new()
        .with_sink(metrics_sink.clone())
        .report(&metrics)
        .await;
    // Operators still see failed runs in the metrics stream.
    assert_eq!(metrics_sink.published().len(), 1);

    let alert_sink = Arc::new(MemoryAlertSink::new());
    let ledger = Arc::new(MemoryAlertLedger::new(RetentionPolicy::default()));
    let gate = AlertGate::new(ledger, alert_sink.clone());
    assert!(!gate.process(&metrics).await.unwrap());
    assert!(alert_sink.sent().is_empty());
}
