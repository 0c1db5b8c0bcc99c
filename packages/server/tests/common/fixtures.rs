//! Request and record fixtures.

use chrono::{DateTime, Utc};
use server_core::domains::backfill::models::{ExternalRunRecord, RunConclusion, RunStatus};
use server_core::domains::backfill::{BackfillRequest, StartRequest};

pub fn start_periods(periods: &[&str]) -> BackfillRequest {
    BackfillRequest::Start(StartRequest {
        periods: Some(periods.iter().map(|p| p.to_string()).collect()),
        range: None,
    })
}

pub fn start_range(range: &str) -> BackfillRequest {
    BackfillRequest::Start(StartRequest {
        periods: None,
        range: Some(range.to_string()),
    })
}

/// A finished run unrelated to the orchestrator, e.g. a manual trigger.
pub fn manual_run(id: &str, created_at: DateTime<Utc>) -> ExternalRunRecord {
    ExternalRunRecord {
        id: id.to_string(),
        status: RunStatus::Completed,
        conclusion: Some(RunConclusion::Success),
        created_at,
        updated_at: created_at,
        url: Some(format!("https://ci.example.org/runs/{}", id)),
    }
}
