//! Terraform subprocess execution.
//!
//! Runs the `init` and `plan` actions against a working copy, capturing
//! exit status, output, and elapsed wall-clock time. Both actions are
//! non-interactive (`-input=false`), take no state lock (`-lock=false`),
//! and disable color so the classifier sees plain text. Every subprocess
//! runs under an explicit timeout; a hung plan fails the run instead of
//! blocking it indefinitely.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{DriftError, Result};

/// Raw result of a plan execution, consumed by the classifier.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// Detailed exit code: 0 = no changes, 2 = changes pending, 1 = error.
    pub exit_code: i32,

    /// Full standard output of the plan.
    pub stdout: String,

    /// Standard error, kept for diagnostics.
    pub stderr: String,

    /// Wall-clock time of the plan subprocess.
    pub duration: Duration,
}

/// Runs terraform subcommands against one working copy.
pub struct TerraformRunner {
    bin: PathBuf,
    work_dir: PathBuf,
    timeout: Duration,
}

impl TerraformRunner {
    /// `working_copy` is joined with `subfolder` when one is configured.
    pub fn new(
        bin: PathBuf,
        working_copy: &Path,
        subfolder: Option<&str>,
        timeout: Duration,
    ) -> Self {
        let work_dir = match subfolder {
            Some(sub) => working_copy.join(sub),
            None => working_copy.to_path_buf(),
        };
        Self {
            bin,
            work_dir,
            timeout,
        }
    }

    /// Run `terraform init`. Output is logged for diagnostics only; a
    /// nonzero exit is logged and left for the plan to surface.
    pub async fn init(&self) -> Result<()> {
        info!(bin = %self.bin.display(), dir = %self.work_dir.display(), "initialising terraform");

        let output = self
            .run(&["init", "-input=false", "-lock=false", "-no-color"])
            .await?;

        debug!(
            stdout = %String::from_utf8_lossy(&output.stdout),
            "terraform init output"
        );
        if !output.status.success() {
            warn!(
                code = output.status.code().unwrap_or(-1),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "terraform init exited nonzero"
            );
        }

        Ok(())
    }

    /// Run `terraform plan -detailed-exitcode` and capture its outcome.
    pub async fn plan(&self) -> Result<PlanOutcome> {
        info!(bin = %self.bin.display(), dir = %self.work_dir.display(), "planning terraform");

        let start = Instant::now();
        let output = self
            .run(&[
                "plan",
                "-detailed-exitcode",
                "-input=false",
                "-lock=false",
                "-no-color",
            ])
            .await?;
        let duration = start.elapsed();

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if exit_code == 1 {
            info!(%stdout, %stderr, "terraform plan failed");
        } else {
            info!(exit_code, elapsed_ms = duration.as_millis() as u64, "plan finished");
        }

        Ok(PlanOutcome {
            exit_code,
            stdout,
            stderr,
            duration,
        })
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        // kill_on_drop: when the timeout fires the child future is dropped;
        // the subprocess must die with it, not keep holding the working copy
        // and provider credentials into the next scheduled run.
        let child = Command::new(&self.bin)
            .args(args)
            .current_dir(&self.work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DriftError::Execution(format!("failed to spawn {}: {e}", self.bin.display()))
            })?;

        tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                DriftError::Execution(format!(
                    "terraform {} timed out after {}s",
                    args[0],
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| DriftError::Execution(format!("terraform {} failed: {e}", args[0])))
    }
}
