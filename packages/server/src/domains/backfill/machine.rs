//! Orchestration state machine.
//!
//! Every command and wake-up mutates an [`OrchestratorState`] in place and
//! reports the next wake-up to schedule, if any. The machine never persists
//! anything itself; the actor decides what to store.
//!
//! ```text
//!   idle|completed|failed --start--> running --pause--> paused --resume--> running
//!   running --wake--> running | completed | failed
//!   failed --retry--> running
//!   any --reset--> idle
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::activities;
use super::errors::OrchestratorError;
use super::models::{
    CompletedPeriod, CurrentJob, ErrorEntry, ErrorKind, ExternalRunRecord, OrchestratorState,
    OrchestratorStatus, Period, RunConclusion,
};
use crate::kernel::ServerDeps;

/// A delayed self-call the host must schedule after persisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledWake {
    pub token: Uuid,
    pub after: Duration,
}

pub struct BackfillMachine<'a> {
    deps: &'a ServerDeps,
}

impl<'a> BackfillMachine<'a> {
    pub fn new(deps: &'a ServerDeps) -> Self {
        Self { deps }
    }

    fn now(&self) -> DateTime<Utc> {
        self.deps.clock.now()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub async fn start(
        &self,
        state: &mut OrchestratorState,
        periods: Vec<Period>,
    ) -> Result<Option<ScheduledWake>, OrchestratorError> {
        if matches!(
            state.status,
            OrchestratorStatus::Running | OrchestratorStatus::Paused
        ) {
            return Err(OrchestratorError::InvalidTransition {
                command: "start",
                status: state.status,
            });
        }
        let Some(first) = periods.first().cloned() else {
            return Err(OrchestratorError::MalformedRequest(
                "at least one period is required".to_string(),
            ));
        };

        let now = self.now();
        info!(periods = periods.len(), first = %first, "Starting backfill");

        *state = OrchestratorState {
            status: OrchestratorStatus::Running,
            periods,
            started_at: Some(now),
            last_activity_at: Some(now),
            ..Default::default()
        };

        self.dispatch(state, first, now).await;
        Ok(self.rearm(state))
    }

    pub fn pause(&self, state: &mut OrchestratorState) -> Result<(), OrchestratorError> {
        if state.status != OrchestratorStatus::Running {
            return Err(OrchestratorError::InvalidTransition {
                command: "pause",
                status: state.status,
            });
        }

        state.status = OrchestratorStatus::Paused;
        state.wake_token = None;
        state.last_activity_at = Some(self.now());
        info!(period = ?state.current_period(), "Backfill paused");
        Ok(())
    }

    /// Resume polling the job dispatched before the pause. Never re-dispatches.
    pub async fn resume(
        &self,
        state: &mut OrchestratorState,
    ) -> Result<Option<ScheduledWake>, OrchestratorError> {
        if state.status != OrchestratorStatus::Paused {
            return Err(OrchestratorError::InvalidTransition {
                command: "resume",
                status: state.status,
            });
        }

        state.status = OrchestratorStatus::Running;
        info!(period = ?state.current_period(), "Backfill resumed");

        self.step(state).await?;
        Ok(self.rearm(state))
    }

    /// Re-dispatch the period that failed.
    pub async fn retry(
        &self,
        state: &mut OrchestratorState,
    ) -> Result<Option<ScheduledWake>, OrchestratorError> {
        if state.status != OrchestratorStatus::Failed {
            return Err(OrchestratorError::InvalidTransition {
                command: "retry",
                status: state.status,
            });
        }
        let Some(period) = state.current_period().cloned() else {
            return Err(OrchestratorError::Internal(format!(
                "failed state has no period at index {}",
                state.current_period_index
            )));
        };

        let now = self.now();
        let started_at = state
            .current_job
            .as_ref()
            .filter(|job| job.period == period)
            .map(|job| job.started_at)
            .unwrap_or(now);

        info!(period = %period, "Retrying period");
        state.status = OrchestratorStatus::Running;
        state.last_activity_at = Some(now);

        self.dispatch(state, period, started_at).await;
        Ok(self.rearm(state))
    }

    pub fn reset(&self, state: &mut OrchestratorState) {
        info!(status = %state.status, "Resetting orchestrator");
        *state = OrchestratorState::default();
    }

    /// Handle a scheduled wake-up. Wakes that arrive while not running, or
    /// that carry a token other than the armed one, leave the state untouched.
    pub async fn wake(
        &self,
        state: &mut OrchestratorState,
        token: Uuid,
    ) -> Result<Option<ScheduledWake>, OrchestratorError> {
        if state.status != OrchestratorStatus::Running {
            debug!(status = %state.status, "Ignoring wake while not running");
            return Ok(None);
        }
        if state.wake_token != Some(token) {
            debug!(%token, "Ignoring stale wake");
            return Ok(None);
        }

        self.step(state).await?;
        Ok(self.rearm(state))
    }

    // =========================================================================
    // Wake step
    // =========================================================================

    /// Observe the run (discovery pass or status poll), then fail on timeout
    /// only if that observation left the same job unresolved.
    async fn step(&self, state: &mut OrchestratorState) -> Result<(), OrchestratorError> {
        let now = self.now();
        state.last_activity_at = Some(now);

        let Some(job) = state.current_job.clone() else {
            return Err(OrchestratorError::Internal(
                "running without a current job".to_string(),
            ));
        };

        match job.external_run_id.as_deref() {
            None => self.discover(state, &job).await,
            Some(run_id) => self.poll(state, &job, run_id).await,
        }

        if state.status != OrchestratorStatus::Running {
            return Ok(());
        }
        let Some(current) = state
            .current_job
            .as_ref()
            .filter(|current| current.period == job.period && current.triggered_at == job.triggered_at)
        else {
            return Ok(());
        };

        let waited = (now - current.triggered_at).to_std().unwrap_or_default();
        if waited > self.deps.settings.max_job_duration {
            let message = format!(
                "Job for {} did not finish within {}s (last status: {})",
                current.period,
                self.deps.settings.max_job_duration.as_secs(),
                current
                    .status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "undiscovered".to_string())
            );
            self.report(state, ErrorKind::OrchestratorTimeout, message).await;
        }
        Ok(())
    }

    async fn discover(&self, state: &mut OrchestratorState, job: &CurrentJob) {
        match activities::discover_run(job.discovery_anchor(), self.deps).await {
            Some(run) => {
                if let Some(current) = state.current_job.as_mut() {
                    current.external_run_id = Some(run.id.clone());
                    current.recovery_attempts = 0;
                }
                self.apply_run(state, run).await;
            }
            None => {
                let attempts = job.recovery_attempts + 1;
                if let Some(current) = state.current_job.as_mut() {
                    current.recovery_attempts = attempts;
                }
                warn!(
                    period = %job.period,
                    attempt = attempts,
                    max = self.deps.settings.max_recovery_attempts,
                    "No run found for dispatch"
                );

                if attempts > self.deps.settings.max_recovery_attempts {
                    let message = format!(
                        "No run created at or after {} found for {} after {} discovery passes",
                        job.discovery_anchor().to_rfc3339(),
                        job.period,
                        attempts
                    );
                    self.report(state, ErrorKind::DiscoveryExhausted, message).await;
                }
            }
        }
    }

    async fn poll(&self, state: &mut OrchestratorState, job: &CurrentJob, run_id: &str) {
        debug!(period = %job.period, run_id, "Polling run");
        match self.deps.control_plane.get_run(run_id).await {
            Ok(run) => self.apply_run(state, run).await,
            Err(e) => {
                let message = format!("Polling run {} failed: {}", run_id, e);
                self.report(state, ErrorKind::PollError, message).await;
            }
        }
    }

    async fn apply_run(&self, state: &mut OrchestratorState, run: ExternalRunRecord) {
        let now = self.now();
        if let Some(job) = state.current_job.as_mut() {
            job.status = Some(run.status);
            job.conclusion = run.conclusion;
            if run.url.is_some() {
                job.url = run.url.clone();
            }
            job.last_checked_at = Some(now);
        }

        if !run.is_terminal() {
            debug!(run_id = %run.id, status = %run.status, "Run still in flight");
            return;
        }

        match run.conclusion {
            Some(conclusion) if conclusion.is_success() => {
                self.advance(state, run, conclusion).await;
            }
            Some(conclusion) => {
                let message = format!("Run {} concluded with {}", run.id, conclusion);
                self.report(state, ErrorKind::RunFailure, message).await;
            }
            None => {
                debug!(run_id = %run.id, "Run completed without a conclusion yet");
            }
        }
    }

    async fn advance(
        &self,
        state: &mut OrchestratorState,
        run: ExternalRunRecord,
        conclusion: RunConclusion,
    ) {
        let now = self.now();
        let Some(period) = state.current_period().cloned() else {
            return;
        };

        info!(period = %period, run_id = %run.id, "Period completed");
        state.completed_periods.push(CompletedPeriod {
            period,
            run_id: run.id,
            conclusion,
            completed_at: now,
            url: run.url,
        });
        state.current_period_index += 1;
        state.current_job = None;

        match state.current_period().cloned() {
            Some(next) => self.dispatch(state, next, now).await,
            None => {
                state.status = OrchestratorStatus::Completed;
                state.wake_token = None;
                info!(periods = state.periods.len(), "Backfill completed");
                activities::notify_completed(state, self.deps).await;
            }
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Record the anchor, then trigger. A rejected trigger fails the period.
    async fn dispatch(&self, state: &mut OrchestratorState, period: Period, started_at: DateTime<Utc>) {
        let triggered_at = self.now();
        state.current_job = Some(CurrentJob::triggered(period.clone(), started_at, triggered_at));

        if let Err(e) = activities::dispatch_period(&period, self.deps).await {
            let message = format!("Dispatch of {} failed: {}", period, e);
            self.report(state, ErrorKind::TriggerError, message).await;
        }
    }

    /// Record an error. Fatal kinds also move the orchestrator to `failed`
    /// and raise a critical alert; a poll error is only logged.
    async fn report(&self, state: &mut OrchestratorState, kind: ErrorKind, message: String) {
        let period = state.current_period().cloned();
        state.errors.push(ErrorEntry {
            kind,
            message: message.clone(),
            period: period.clone(),
            timestamp: self.now(),
        });

        if !kind.is_fatal() {
            warn!(period = ?period, kind = %kind, "{}", message);
            return;
        }

        error!(period = ?period, kind = %kind, "{}", message);
        state.status = OrchestratorStatus::Failed;
        state.wake_token = None;
        activities::notify_failed(state, kind, &message, self.deps).await;
    }

    /// Arm a fresh wake token while running. The first wake after a dispatch
    /// waits `discovery_delay`, every later one `poll_interval`.
    fn rearm(&self, state: &mut OrchestratorState) -> Option<ScheduledWake> {
        if state.status != OrchestratorStatus::Running {
            state.wake_token = None;
            return None;
        }

        let fresh_dispatch = state
            .current_job
            .as_ref()
            .map(|job| !job.is_discovered() && job.recovery_attempts == 0)
            .unwrap_or(false);
        let after = if fresh_dispatch {
            self.deps.settings.discovery_delay
        } else {
            self.deps.settings.poll_interval
        };

        let token = Uuid::new_v4();
        state.wake_token = Some(token);
        Some(ScheduledWake { token, after })
    }
}
