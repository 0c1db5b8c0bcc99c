//! The singleton orchestrator record and its persisted form.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ErrorLog, Period, RunConclusion, RunStatus};

/// Bumped whenever the record layout changes incompatibly. Records carrying an
/// older (or no) version are discarded on load.
pub const SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Failed,
}

impl fmt::Display for OrchestratorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The job currently dispatched for `periods[current_period_index]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentJob {
    /// Set once discovery correlated the dispatch with a run.
    #[serde(default)]
    pub external_run_id: Option<String>,
    pub period: Period,
    #[serde(default)]
    pub status: Option<RunStatus>,
    #[serde(default)]
    pub conclusion: Option<RunConclusion>,
    #[serde(default)]
    pub url: Option<String>,
    /// First dispatch of this period; survives `retry`.
    pub started_at: DateTime<Utc>,
    /// Correlation anchor of the latest dispatch.
    pub triggered_at: DateTime<Utc>,
    #[serde(default)]
    pub recovery_attempts: u32,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl CurrentJob {
    pub fn triggered(period: Period, started_at: DateTime<Utc>, triggered_at: DateTime<Utc>) -> Self {
        Self {
            external_run_id: None,
            period,
            status: None,
            conclusion: None,
            url: None,
            started_at,
            triggered_at,
            recovery_attempts: 0,
            last_checked_at: None,
        }
    }

    /// Discovery anchor at the control plane's one-second timestamp resolution.
    pub fn discovery_anchor(&self) -> DateTime<Utc> {
        self.triggered_at.trunc_subsecs(0)
    }

    pub fn is_discovered(&self) -> bool {
        self.external_run_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedPeriod {
    pub period: Period,
    pub run_id: String,
    pub conclusion: RunConclusion,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorState {
    pub schema_version: u32,
    pub status: OrchestratorStatus,
    pub periods: Vec<Period>,
    pub current_period_index: usize,
    pub current_job: Option<CurrentJob>,
    pub completed_periods: Vec<CompletedPeriod>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub errors: ErrorLog,
    /// Token of the only wake-up this record will act on.
    pub wake_token: Option<Uuid>,
}

impl Default for OrchestratorState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            status: OrchestratorStatus::Idle,
            periods: Vec::new(),
            current_period_index: 0,
            current_job: None,
            completed_periods: Vec::new(),
            started_at: None,
            last_activity_at: None,
            errors: ErrorLog::default(),
            wake_token: None,
        }
    }
}

/// Derived view returned alongside the state by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    pub status: OrchestratorStatus,
    pub current_period: Option<Period>,
    pub completed: usize,
    pub total: usize,
    pub progress: f64,
    pub elapsed_secs: Option<i64>,
    pub external_run_id: Option<String>,
    pub run_url: Option<String>,
    pub recovery_attempts: u32,
}

impl OrchestratorState {
    /// Decode a stored record.
    ///
    /// Anything that is not a current-schema record (missing or older
    /// `schema_version`, not an object, undecodable) is discarded and replaced
    /// by defaults. Missing optional fields are filled from defaults.
    pub fn from_record(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Stored orchestrator record is not JSON, reinitializing");
                return Self::default();
            }
        };

        let version = value.get("schema_version").and_then(serde_json::Value::as_u64);
        match version {
            Some(v) if v >= SCHEMA_VERSION as u64 => {
                if v > SCHEMA_VERSION as u64 {
                    tracing::warn!(
                        stored = v,
                        current = SCHEMA_VERSION,
                        "Stored orchestrator record is from a newer schema, decoding anyway"
                    );
                }
            }
            other => {
                tracing::warn!(
                    stored = ?other,
                    current = SCHEMA_VERSION,
                    "Discarding orchestrator record from an older schema"
                );
                return Self::default();
            }
        }

        match serde_json::from_value::<Self>(value) {
            Ok(mut state) => {
                state.schema_version = SCHEMA_VERSION;
                state
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored orchestrator record failed to decode, reinitializing");
                Self::default()
            }
        }
    }

    pub fn to_record(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn current_period(&self) -> Option<&Period> {
        self.periods.get(self.current_period_index)
    }

    pub fn progress(&self) -> f64 {
        if self.periods.is_empty() {
            return 0.0;
        }
        self.completed_periods.len() as f64 / self.periods.len() as f64
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.started_at.map(|started| now - started)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> StateSummary {
        StateSummary {
            status: self.status,
            current_period: self.current_period().cloned(),
            completed: self.completed_periods.len(),
            total: self.periods.len(),
            progress: self.progress(),
            elapsed_secs: self.elapsed(now).map(|d| d.num_seconds()),
            external_run_id: self
                .current_job
                .as_ref()
                .and_then(|job| job.external_run_id.clone()),
            run_url: self.current_job.as_ref().and_then(|job| job.url.clone()),
            recovery_attempts: self
                .current_job
                .as_ref()
                .map(|job| job.recovery_attempts)
                .unwrap_or_default(),
        }
    }

    /// Structural invariants that must hold after every handler. Returns a
    /// description of each violation.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let len = self.periods.len();

        if self.current_period_index > len {
            violations.push(format!(
                "current_period_index {} exceeds period count {}",
                self.current_period_index, len
            ));
        }

        let at_end = len > 0 && self.current_period_index == len;
        if at_end != (self.status == OrchestratorStatus::Completed) {
            violations.push(format!(
                "index {} of {} does not agree with status {}",
                self.current_period_index, len, self.status
            ));
        }

        if matches!(
            self.status,
            OrchestratorStatus::Running | OrchestratorStatus::Paused
        ) {
            match (&self.current_job, self.current_period()) {
                (Some(job), Some(period)) if &job.period == period => {}
                (job, period) => violations.push(format!(
                    "current job period {:?} does not match periods[index] {:?}",
                    job.as_ref().map(|j| &j.period),
                    period
                )),
            }
        }

        if self.status != OrchestratorStatus::Idle
            && self.completed_periods.len() != self.current_period_index
        {
            violations.push(format!(
                "{} completed periods but index is {}",
                self.completed_periods.len(),
                self.current_period_index
            ));
        }

        for (i, done) in self.completed_periods.iter().enumerate() {
            if self.periods.get(i) != Some(&done.period) {
                violations.push(format!(
                    "completed period {} at position {} is out of order",
                    done.period, i
                ));
            }
        }

        if self.status != OrchestratorStatus::Running && self.wake_token.is_some() {
            violations.push(format!("wake token armed while {}", self.status));
        }

        violations
    }
}
