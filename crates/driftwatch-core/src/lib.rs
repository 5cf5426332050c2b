//! Driftwatch Core Library
//!
//! The drift-detection pipeline: resolve the Terraform version pinned in
//! remote state, install that binary, materialize the current head of the
//! configuration repository, run `terraform plan`, classify the output into
//! structured metrics, report them, and decide whether to alert.
//!
//! One invocation performs exactly one linear pass:
//!
//! ```text
//! VersionResolved -> Installed -> SourceFetched -> Initialized -> Planned
//!     -> Classified -> Reported -> (Alerted | Skipped)
//! ```

pub mod alert;
pub mod classify;
pub mod context;
pub mod error;
pub mod fakes;
pub mod fetch;
pub mod install;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod source;
pub mod telemetry;
pub mod version;

pub use alert::{fingerprint, AlertGate, AlertSink, SlackWebhook};
pub use classify::classify;
pub use context::RunContext;
pub use error::{DriftError, Result};
pub use fetch::ArtifactFetcher;
pub use install::ToolInstaller;
pub use metrics::{PlanMetrics, PlanStatus};
pub use pipeline::{DriftPipeline, PipelineConfig, RunReport};
pub use report::{render_summary, MetricsSink, Reporter};
pub use runner::{PlanOutcome, TerraformRunner};
pub use source::SourceFetcher;
pub use telemetry::init_tracing;
pub use version::resolve_tool_version;
