//! Background sweep for submissions stuck before finalization.
//!
//! A submission stays processing until every result reports. If a callback
//! is lost and nobody polls again, the sweep resolves it: fully reported
//! submissions get their normal verdict, the rest become errored. Rows left
//! queued by an interrupted create are swept the same way.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::SweepSettings;
use crate::error::AppResult;
use crate::models::SubmissionStatus;

use super::orchestrator::SubmissionOrchestrator;

/// Submissions resolved per sweep cycle.
const SWEEP_BATCH_SIZE: u64 = 100;

/// Counts from one sweep cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub finalized: usize,
    pub errored: usize,
    pub failures: usize,
}

/// Start the sweep background task.
pub fn start_sweep_task(orchestrator: SubmissionOrchestrator, settings: SweepSettings) {
    tokio::spawn(async move {
        info!(
            "Starting stale submission sweep (stale after: {} seconds, interval: {} seconds)",
            settings.stale_after_secs, settings.interval_secs
        );

        let mut ticker = interval(Duration::from_secs(settings.interval_secs));

        loop {
            ticker.tick().await;

            if let Err(e) = run_sweep(&orchestrator, settings.stale_after_secs).await {
                error!("Sweep task error: {}", e);
            }
        }
    });
}

/// `now - stale_after_secs`, or `None` when that is not a representable instant.
fn stale_cutoff(now: DateTime<Utc>, stale_after_secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(stale_after_secs).ok()?;
    now.checked_sub_signed(chrono::Duration::try_seconds(secs)?)
}

/// Run a single sweep cycle.
pub async fn run_sweep(
    orchestrator: &SubmissionOrchestrator,
    stale_after_secs: u64,
) -> AppResult<SweepReport> {
    let Some(cutoff) = stale_cutoff(Utc::now(), stale_after_secs) else {
        warn!(
            "Stale threshold of {} seconds is out of range; skipping sweep",
            stale_after_secs
        );
        return Ok(SweepReport::default());
    };
    let stale = orchestrator
        .pool()
        .find_stale_unfinished(cutoff, SWEEP_BATCH_SIZE)
        .await?;

    let mut report = SweepReport::default();
    if stale.is_empty() {
        return Ok(report);
    }

    info!("Found {} stale unfinished submissions", stale.len());

    for submission in stale {
        match orchestrator.expire(submission.id).await {
            Ok(SubmissionStatus::Errored) => report.errored += 1,
            Ok(_) => report.finalized += 1,
            Err(e) => {
                error!("Failed to expire submission {}: {}", submission.id, e);
                report.failures += 1;
            }
        }
    }

    info!(
        "Sweep complete: {} finalized, {} errored, {} failures",
        report.finalized, report.errored, report.failures
    );

    Ok(report)
}
