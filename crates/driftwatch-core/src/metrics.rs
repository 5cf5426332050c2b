//! Structured plan metrics.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tri-state verdict of a plan execution, derived from the detailed exit
/// code convention: 0 = no changes, 2 = changes pending, 1 = plan error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Exit code 0: live state matches configuration.
    Clean,

    /// Exit code 2: pending changes — drift.
    Drift,

    /// Exit code 1: the plan itself failed; its output is untrusted.
    Failed,
}

impl PlanStatus {
    /// Stable lowercase label used in fingerprints and metric names.
    pub fn label(&self) -> &'static str {
        match self {
            PlanStatus::Clean => "clean",
            PlanStatus::Drift => "drift",
            PlanStatus::Failed => "failed",
        }
    }
}

/// Metrics record produced once per run by the classifier.
///
/// Immutable after construction; `pending_total` always equals the sum of
/// the three pending counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanMetrics {
    /// Verdict derived from the plan exit code.
    pub status: PlanStatus,

    /// Number of "Refreshing state..." lines observed. A coarse proxy for
    /// managed inventory size; duplicate lines count separately.
    pub resource_count: u64,

    /// Resources the plan would add.
    pub pending_add: u64,

    /// Resources the plan would change in place.
    pub pending_change: u64,

    /// Resources the plan would destroy.
    pub pending_destroy: u64,

    /// Always `pending_add + pending_change + pending_destroy`.
    pub pending_total: u64,

    /// Wall-clock time of the plan subprocess.
    pub plan_duration: Duration,
}

impl PlanMetrics {
    /// Construct a record, deriving `pending_total` from the three counts.
    pub fn new(
        status: PlanStatus,
        resource_count: u64,
        pending_add: u64,
        pending_change: u64,
        pending_destroy: u64,
        plan_duration: Duration,
    ) -> Self {
        Self {
            status,
            resource_count,
            pending_add,
            pending_change,
            pending_destroy,
            pending_total: pending_add + pending_change + pending_destroy,
            plan_duration,
        }
    }
}
