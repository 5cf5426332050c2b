//! Driftwatch - Terraform configuration drift detector
//!
//! One `driftwatch run` invocation performs one end-to-end drift-detection
//! pass and exits: nonzero on fatal pipeline errors, zero otherwise (sink
//! delivery failures are logged, not fatal). Designed to be invoked on a
//! schedule by an external timer (cron, systemd, a CI schedule).
//!
//! ## Commands
//!
//! - `run`: execute one drift-detection pipeline run
//! - `classify`: classify a saved plan output offline (debugging aid)

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, Level};

use driftwatch_core::{
    classify, AlertGate, ArtifactFetcher, DriftPipeline, MetricsSink, PipelineConfig, PlanMetrics,
    Reporter, RunContext, SlackWebhook, SourceFetcher, ToolInstaller,
};
use driftwatch_store::{AlertLedger, MemoryAlertLedger, RetentionPolicy, SqliteAlertLedger};

#[derive(Parser)]
#[command(name = "driftwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Terraform configuration drift detector", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, env = "DEBUG")]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one drift-detection run
    Run {
        #[command(flatten)]
        settings: Settings,
    },

    /// Classify a saved plan output file and print the metrics as JSON
    Classify {
        /// Path to a captured `terraform plan` stdout
        #[arg(short, long)]
        input: PathBuf,

        /// Detailed exit code the plan finished with
        #[arg(long, default_value_t = 2)]
        exit_code: i32,
    },
}

/// Alert ledger backend selection.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum DbType {
    /// Durable single-file SQLite ledger
    Sqlite,
    /// Process-local ledger (no dedup across invocations)
    Memory,
}

/// Run configuration. Every option has an environment-variable fallback so
/// the binary can be configured entirely from a scheduler's environment.
#[derive(Args, Debug)]
struct Settings {
    /// S3 bucket holding the Terraform remote state
    #[arg(long, env = "TERRAFORM_S3_BUCKET")]
    state_bucket: String,

    /// Key of the remote state object within the bucket
    #[arg(long, env = "TERRAFORM_S3_KEY")]
    state_key: String,

    /// GitHub repository (org/name) holding the Terraform configuration
    #[arg(long, env = "TERRAFORM_GITHUB_REPO")]
    repo: String,

    /// Branch to plan against
    #[arg(long, env = "TERRAFORM_GITHUB_BRANCH", default_value = "master")]
    branch: String,

    /// GitHub API token
    #[arg(long, env = "TERRAFORM_GITHUB_TOKEN")]
    token: String,

    /// Subdirectory of the repository to plan in
    #[arg(long, env = "TERRAFORM_GITHUB_FOLDER")]
    subfolder: Option<String>,

    /// Slack incoming-webhook URL; alerting is disabled when unset
    #[arg(long, env = "SLACK_WEBHOOK_URL")]
    webhook_url: Option<String>,

    /// Metrics namespace; the metrics sink is disabled when unset
    #[arg(long, env = "METRICS_NAMESPACE")]
    metrics_namespace: Option<String>,

    /// Scratch directory for downloads, the tool binary, and working copies
    #[arg(long, env = "TMP_FOLDER", default_value = "/tmp")]
    tmp_dir: PathBuf,

    /// Timeout in seconds for each terraform subprocess
    #[arg(long, env = "PLAN_TIMEOUT_SECS", default_value_t = 1800)]
    plan_timeout_secs: u64,

    /// Alert ledger backend
    #[arg(long, env = "DB_TYPE", value_enum, default_value = "sqlite")]
    db_type: DbType,

    /// Path of the SQLite ledger database
    #[arg(long, env = "DB_NAME", default_value = "driftwatch.db")]
    db_name: PathBuf,

    /// Re-alert for an unchanged drift condition after this many seconds;
    /// unset deduplicates forever
    #[arg(long, env = "REALERT_AFTER_SECS")]
    realert_after_secs: Option<i64>,
}

/// Metrics sink that emits one structured log event per run with named
/// numeric fields, for collection by a log-shipping pipeline.
struct LogMetricsSink {
    namespace: String,
}

#[async_trait]
impl MetricsSink for LogMetricsSink {
    async fn publish(&self, metrics: &PlanMetrics) -> driftwatch_core::Result<()> {
        info!(
            namespace = %self.namespace,
            status = metrics.status.label(),
            resource_count = metrics.resource_count,
            pending_add = metrics.pending_add,
            pending_change = metrics.pending_change,
            pending_destroy = metrics.pending_destroy,
            pending_total = metrics.pending_total,
            plan_duration_ms = metrics.plan_duration.as_millis() as u64,
            "drift metrics"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    driftwatch_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run { settings } => cmd_run(settings).await,
        Commands::Classify { input, exit_code } => cmd_classify(&input, exit_code).await,
    }
}

/// Flip the run context's cancellation flag on SIGINT or SIGTERM. The
/// pipeline observes it at its next inter-stage checkpoint.
fn spawn_signal_listener(ctx: &RunContext) -> Result<()> {
    let flag = ctx.cancel_flag();
    let mut term = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("caught SIGINT, requesting cancellation"),
            _ = term.recv() => info!("caught SIGTERM, requesting cancellation"),
        }
        flag.store(true, Ordering::SeqCst);
    });

    Ok(())
}

async fn cmd_run(settings: Settings) -> Result<()> {
    info!("starting drift-detection run");

    let ctx = RunContext::new();
    spawn_signal_listener(&ctx)?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("driftwatch/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("building http client")?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let fetcher =
        ArtifactFetcher::new(http.clone()).with_s3(aws_sdk_s3::Client::new(&aws_config));

    let installer = ToolInstaller::new(settings.tmp_dir.clone());
    let source = SourceFetcher::new(
        http.clone(),
        settings.repo.clone(),
        settings.branch.clone(),
        settings.token.clone(),
        settings.tmp_dir.clone(),
    );

    let mut reporter = Reporter::new();
    if let Some(namespace) = &settings.metrics_namespace {
        reporter = reporter.with_sink(Arc::new(LogMetricsSink {
            namespace: namespace.clone(),
        }));
    }

    let retention = RetentionPolicy {
        realert_after: settings.realert_after_secs.map(chrono::Duration::seconds),
    };
    let gate = match &settings.webhook_url {
        Some(url) => {
            let ledger: Arc<dyn AlertLedger> = match settings.db_type {
                DbType::Sqlite => Arc::new(
                    SqliteAlertLedger::open(&settings.db_name, retention)
                        .context("opening alert ledger")?,
                ),
                DbType::Memory => Arc::new(MemoryAlertLedger::new(retention)),
            };
            let webhook = Arc::new(SlackWebhook::new(http.clone(), url.clone()));
            Some(AlertGate::new(ledger, webhook))
        }
        None => None,
    };

    let pipeline = DriftPipeline::new(
        PipelineConfig {
            state_uri: format!("s3://{}/{}", settings.state_bucket, settings.state_key),
            subfolder: settings.subfolder.clone(),
            plan_timeout: Duration::from_secs(settings.plan_timeout_secs),
        },
        fetcher,
        installer,
        source,
        reporter,
        gate,
    );

    let report = pipeline.run(&ctx).await.context("drift run failed")?;
    info!(
        status = report.metrics.status.label(),
        alerted = report.alerted,
        "run complete"
    );

    Ok(())
}

async fn cmd_classify(input: &Path, exit_code: i32) -> Result<()> {
    let stdout = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;

    let metrics = classify(exit_code, &stdout, Duration::ZERO)?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    Ok(())
}
