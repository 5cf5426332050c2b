//! Plan output classification — raw subprocess output to [`PlanMetrics`].
//!
//! This is a pure text-to-record transform with no I/O, kept independent of
//! subprocess execution so it can be tested directly against captured plan
//! output.

use std::time::Duration;

use regex::Regex;

use crate::error::{DriftError, Result};
use crate::metrics::{PlanMetrics, PlanStatus};

/// Classify a plan execution into a metrics record.
///
/// Exit code mapping: 0 = `Clean`, 2 = `Drift`, 1 = `Failed`. Any other
/// code is an execution error. A failed plan's textual output is not
/// trusted: all counts are zero and no parsing happens.
pub fn classify(exit_code: i32, stdout: &str, elapsed: Duration) -> Result<PlanMetrics> {
    let status = match exit_code {
        0 => PlanStatus::Clean,
        2 => PlanStatus::Drift,
        1 => {
            return Ok(PlanMetrics::new(PlanStatus::Failed, 0, 0, 0, 0, elapsed));
        }
        other => {
            return Err(DriftError::Execution(format!(
                "unexpected terraform plan exit code {other}"
            )));
        }
    };

    let refresh_re = Regex::new(r"Refreshing state\.\.\.")
        .map_err(|e| DriftError::Parse(format!("refresh marker regex: {e}")))?;
    let summary_re = Regex::new(r"Plan: (\d+) to add, (\d+) to change, (\d+) to destroy\.")
        .map_err(|e| DriftError::Parse(format!("plan summary regex: {e}")))?;

    let mut resource_count = 0u64;
    let mut pending_add = 0u64;
    let mut pending_change = 0u64;
    let mut pending_destroy = 0u64;

    for line in stdout.lines() {
        if refresh_re.is_match(line) {
            resource_count += 1;
        }

        // Last summary line wins; expected to occur at most once.
        if let Some(caps) = summary_re.captures(line) {
            pending_add = parse_count(&caps[1])?;
            pending_change = parse_count(&caps[2])?;
            pending_destroy = parse_count(&caps[3])?;
        }
    }

    Ok(PlanMetrics::new(
        status,
        resource_count,
        pending_add,
        pending_change,
        pending_destroy,
        elapsed,
    ))
}

fn parse_count(digits: &str) -> Result<u64> {
    digits
        .parse::<u64>()
        .map_err(|e| DriftError::Parse(format!("plan summary count '{digits}': {e}")))
}
