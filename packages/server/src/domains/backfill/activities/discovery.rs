//! Correlate a fire-and-forget dispatch with the run it created.
//!
//! The control plane does not return a run id on dispatch, so the run is found
//! by listing recent runs and picking the first one created at or after the
//! dispatch anchor. Runs are listed most-recent-first.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domains::backfill::models::ExternalRunRecord;
use crate::kernel::ServerDeps;

/// First record (in listing order) created at or after `anchor`.
///
/// `created_at` has whole-second resolution and `anchor` is truncated to match,
/// so a run created earlier within the same second as the dispatch can be selected.
pub fn select_run(runs: &[ExternalRunRecord], anchor: DateTime<Utc>) -> Option<&ExternalRunRecord> {
    runs.iter().find(|run| run.created_at >= anchor)
}

/// One discovery pass: up to `discovery_attempts` listings separated by
/// `discovery_interval`. Listing failures count as an empty attempt.
pub async fn discover_run(anchor: DateTime<Utc>, deps: &ServerDeps) -> Option<ExternalRunRecord> {
    let settings = &deps.settings;
    let attempts = settings.discovery_attempts.max(1);

    for attempt in 1..=attempts {
        if attempt > 1 && !settings.discovery_interval.is_zero() {
            tokio::time::sleep(settings.discovery_interval).await;
        }

        match deps
            .control_plane
            .list_recent_runs(&settings.job_name, settings.run_list_limit)
            .await
        {
            Ok(runs) => {
                if let Some(run) = select_run(&runs, anchor) {
                    info!(run_id = %run.id, attempt, anchor = %anchor, "Discovered run");
                    return Some(run.clone());
                }
                debug!(attempt, listed = runs.len(), anchor = %anchor, "No run after anchor yet");
            }
            Err(e) => {
                warn!(attempt, error = %e, "Listing recent runs failed");
            }
        }
    }

    None
}
