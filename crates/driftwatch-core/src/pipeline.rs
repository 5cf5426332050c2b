//! The drift-detection pipeline: one strictly linear pass per invocation.
//!
//! Any fatal failure at or before the plan aborts the run with no metrics.
//! A `Failed` classification still reaches the reporter (operators must see
//! failures) but never the alert gate. Cancellation is checked between
//! stages; in-flight operations finish under their own timeouts.

use std::time::Duration;

use tracing::{error, info};

use crate::alert::AlertGate;
use crate::classify::classify;
use crate::context::RunContext;
use crate::error::Result;
use crate::fetch::ArtifactFetcher;
use crate::install::ToolInstaller;
use crate::metrics::PlanMetrics;
use crate::report::Reporter;
use crate::runner::TerraformRunner;
use crate::source::SourceFetcher;
use crate::version::resolve_tool_version;

/// Settings the pipeline itself needs; collaborator-specific settings live
/// in the collaborators.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Locator of the remote state descriptor (`s3://bucket/key` or a path).
    pub state_uri: String,

    /// Optional subdirectory of the working copy to plan in.
    pub subfolder: Option<String>,

    /// Timeout applied to each terraform subprocess.
    pub plan_timeout: Duration,
}

/// Outcome of one completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub metrics: PlanMetrics,
    pub alerted: bool,
}

/// One end-to-end drift-detection run.
pub struct DriftPipeline {
    config: PipelineConfig,
    fetcher: ArtifactFetcher,
    installer: ToolInstaller,
    source: SourceFetcher,
    reporter: Reporter,
    gate: Option<AlertGate>,
}

impl DriftPipeline {
    pub fn new(
        config: PipelineConfig,
        fetcher: ArtifactFetcher,
        installer: ToolInstaller,
        source: SourceFetcher,
        reporter: Reporter,
        gate: Option<AlertGate>,
    ) -> Self {
        Self {
            config,
            fetcher,
            installer,
            source,
            reporter,
            gate,
        }
    }

    /// Execute the pipeline:
    /// version resolution -> install -> source fetch -> init -> plan ->
    /// classification -> report -> alert decision.
    pub async fn run(&self, ctx: &RunContext) -> Result<RunReport> {
        ctx.checkpoint()?;
        let version = resolve_tool_version(&self.fetcher, &self.config.state_uri).await?;

        ctx.checkpoint()?;
        let terraform_bin = self.installer.install(&self.fetcher, &version).await?;

        ctx.checkpoint()?;
        let working_copy = self.source.fetch_head(&self.fetcher).await?;

        let runner = TerraformRunner::new(
            terraform_bin,
            &working_copy,
            self.config.subfolder.as_deref(),
            self.config.plan_timeout,
        );

        ctx.checkpoint()?;
        runner.init().await?;

        ctx.checkpoint()?;
        let outcome = runner.plan().await?;

        let metrics = classify(outcome.exit_code, &outcome.stdout, outcome.duration)?;
        info!(
            status = metrics.status.label(),
            resources = metrics.resource_count,
            pending_total = metrics.pending_total,
            "plan classified"
        );

        ctx.checkpoint()?;
        self.reporter.report(&metrics).await;

        let alerted = match &self.gate {
            Some(gate) => match gate.process(&metrics).await {
                Ok(alerted) => alerted,
                // Delivery failures never abort the run: metrics are
                // already reported, the next run retries the alert.
                Err(e) => {
                    error!(error = %e, "alert delivery failed");
                    false
                }
            },
            None => false,
        };

        Ok(RunReport { metrics, alerted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriftError;
    use std::path::PathBuf;

    fn dummy_pipeline(tmp: PathBuf) -> DriftPipeline {
        let http = reqwest::Client::new();
        DriftPipeline::new(
            PipelineConfig {
                state_uri: "/nonexistent/terraform.tfstate".to_string(),
                subfolder: None,
                plan_timeout: Duration::from_secs(1),
            },
            ArtifactFetcher::new(http.clone()),
            ToolInstaller::new(tmp.clone()),
            SourceFetcher::new(http, "acme/infra", "main", "token", tmp),
            Reporter::new(),
            None,
        )
    }

    #[tokio::test]
    async fn cancelled_context_aborts_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = dummy_pipeline(dir.path().to_path_buf());

        let ctx = RunContext::new();
        ctx.request_cancel();

        let result = pipeline.run(&ctx).await;
        assert!(matches!(result, Err(DriftError::Cancelled)));
    }

    #[tokio::test]
    async fn missing_state_descriptor_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = dummy_pipeline(dir.path().to_path_buf());

        let result = pipeline.run(&RunContext::new()).await;
        assert!(matches!(result, Err(DriftError::Fetch(_))));
    }
}
