// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Orchestration decisions live in domains/backfill and only talk to these traits.
//
// Naming convention: Base* for trait names (e.g., BaseControlPlane, BaseAlertSink)

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domains::backfill::models::ExternalRunRecord;

// =============================================================================
// Control Plane Trait (Infrastructure - executes period jobs)
// =============================================================================

#[async_trait]
pub trait BaseControlPlane: Send + Sync {
    /// Trigger a job. Fire-and-forget: `Ok` only means the trigger request was
    /// accepted, not that a run exists yet.
    async fn dispatch(&self, job_name: &str, params: &BTreeMap<String, String>) -> Result<()>;

    /// Most recent runs of a job, newest first. `created_at` must order runs
    /// consistently with the order in which they were dispatched.
    async fn list_recent_runs(&self, job_name: &str, limit: u32)
        -> Result<Vec<ExternalRunRecord>>;

    /// Fetch one run by the id discovery recorded.
    async fn get_run(&self, run_id: &str) -> Result<ExternalRunRecord>;
}

// =============================================================================
// Alert Sink Trait (Infrastructure - terminal outcome notifications)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

#[async_trait]
pub trait BaseAlertSink: Send + Sync {
    /// Deliver one notification. Callers log and discard failures.
    async fn notify(&self, severity: AlertSeverity, title: &str, message: &str) -> Result<()>;
}

// =============================================================================
// Clock Trait (Infrastructure)
// =============================================================================

pub trait BaseClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
