//! Terminal-outcome notifications.
//!
//! Alerts are a side channel: delivery failures are logged and never affect
//! the orchestrator state.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domains::backfill::models::{ErrorKind, OrchestratorState};
use crate::kernel::{AlertSeverity, ServerDeps};

pub async fn notify_completed(state: &OrchestratorState, deps: &ServerDeps) {
    let now = deps.clock.now();
    let title = format!("Backfill completed: {} periods", state.periods.len());
    let message = describe(state, now);
    send(AlertSeverity::Info, &title, &message, deps).await;
}

pub async fn notify_failed(state: &OrchestratorState, kind: ErrorKind, reason: &str, deps: &ServerDeps) {
    let now = deps.clock.now();
    let period = state
        .current_period()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string());
    let title = format!("Backfill failed on {}: {}", period, kind);
    let message = format!("{}. {}", reason, describe(state, now));
    send(AlertSeverity::Critical, &title, &message, deps).await;
}

async fn send(severity: AlertSeverity, title: &str, message: &str, deps: &ServerDeps) {
    if let Err(e) = deps.alerts.notify(severity, title, message).await {
        warn!(%severity, title, error = %e, "Alert delivery failed");
    }
}

/// Current period, progress fraction and elapsed time in one line.
pub fn describe(state: &OrchestratorState, now: DateTime<Utc>) -> String {
    let current = state
        .current_period()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "none".to_string());
    let elapsed = state
        .elapsed(now)
        .map(format_elapsed)
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        "Current period: {}. Progress: {}/{} ({:.0}%). Elapsed: {}",
        current,
        state.completed_periods.len(),
        state.periods.len(),
        state.progress() * 100.0,
        elapsed
    )
}

fn format_elapsed(elapsed: chrono::Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else {
        format!("{}m {:02}s", minutes, seconds)
    }
}
