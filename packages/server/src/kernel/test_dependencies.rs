// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use super::{AlertSeverity, BaseAlertSink, BaseClock, BaseControlPlane, ServerDeps};
use crate::common::OperatorCredentials;
use crate::domains::backfill::models::{ExternalRunRecord, RunConclusion, RunStatus};
use crate::domains::backfill::OrchestratorSettings;

/// Token accepted by the credentials built from [`TestDependencies`].
pub const TEST_OPERATOR_TOKEN: &str = "test-operator-token";

// =============================================================================
// Mock Clock
// =============================================================================

pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(chrono::Duration::seconds(secs));
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseClock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// =============================================================================
// Mock Control Plane
// =============================================================================

/// Arguments captured from a dispatch call
#[derive(Debug, Clone)]
pub struct DispatchCall {
    pub job_name: String,
    pub params: BTreeMap<String, String>,
    pub at: DateTime<Utc>,
}

/// Shape of the run created for each successful dispatch
#[derive(Debug, Clone)]
pub struct RunTemplate {
    pub status: RunStatus,
    pub conclusion: Option<RunConclusion>,
    /// Listing calls that will not yet see the new run
    pub hidden_for_lists: u32,
}

struct MockRun {
    record: ExternalRunRecord,
    hidden_for_lists: u32,
}

#[derive(Default)]
struct ControlPlaneState {
    dispatches: Vec<DispatchCall>,
    dispatch_failures: VecDeque<String>,
    runs: Vec<MockRun>,
    template: Option<RunTemplate>,
    list_calls: usize,
    get_calls: Vec<String>,
    get_failures: u32,
    next_id: u64,
}

pub struct MockControlPlane {
    clock: Arc<MockClock>,
    state: Mutex<ControlPlaneState>,
}

impl MockControlPlane {
    pub fn new(clock: Arc<MockClock>) -> Self {
        Self {
            clock,
            state: Mutex::new(ControlPlaneState {
                next_id: 1000,
                ..Default::default()
            }),
        }
    }

    /// Every successful dispatch creates a run one second later.
    pub fn spawning_runs(self, status: RunStatus, conclusion: Option<RunConclusion>) -> Self {
        self.state.lock().unwrap().template = Some(RunTemplate {
            status,
            conclusion,
            hidden_for_lists: 0,
        });
        self
    }

    /// Newly created runs stay invisible to the first `lists` listing calls.
    pub fn with_visibility_lag(self, lists: u32) -> Self {
        if let Some(template) = self.state.lock().unwrap().template.as_mut() {
            template.hidden_for_lists = lists;
        }
        self
    }

    /// Stop creating runs on dispatch (the trigger is accepted but silently dropped).
    pub fn dropping_runs(self) -> Self {
        self.state.lock().unwrap().template = None;
        self
    }

    /// Seed a run that already exists, e.g. a manual run from before the dispatch.
    pub fn with_existing_run(self, record: ExternalRunRecord) -> Self {
        self.state.lock().unwrap().runs.insert(
            0,
            MockRun {
                record,
                hidden_for_lists: 0,
            },
        );
        self
    }

    pub fn fail_next_dispatch(&self, message: &str) {
        self.state
            .lock()
            .unwrap()
            .dispatch_failures
            .push_back(message.to_string());
    }

    pub fn fail_next_gets(&self, count: u32) {
        self.state.lock().unwrap().get_failures = count;
    }

    /// Move an existing run to a new status/conclusion.
    pub fn set_run_outcome(&self, run_id: &str, status: RunStatus, conclusion: Option<RunConclusion>) {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        if let Some(run) = state.runs.iter_mut().find(|r| r.record.id == run_id) {
            run.record.status = status;
            run.record.conclusion = conclusion;
            run.record.updated_at = now;
        }
    }

    pub fn dispatch_calls(&self) -> Vec<DispatchCall> {
        self.state.lock().unwrap().dispatches.clone()
    }

    pub fn dispatched_periods(&self) -> Vec<String> {
        self.dispatch_calls()
            .into_iter()
            .filter_map(|call| call.params.get("period").cloned())
            .collect()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().get_calls.clone()
    }

    /// Id of the most recently created run, if any.
    pub fn latest_run_id(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .runs
            .first()
            .map(|r| r.record.id.clone())
    }
}

#[async_trait]
impl BaseControlPlane for MockControlPlane {
    async fn dispatch(&self, job_name: &str, params: &BTreeMap<String, String>) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();

        if let Some(message) = state.dispatch_failures.pop_front() {
            anyhow::bail!("{}", message);
        }

        state.dispatches.push(DispatchCall {
            job_name: job_name.to_string(),
            params: params.clone(),
            at: now,
        });

        if let Some(template) = state.template.clone() {
            let id = state.next_id;
            state.next_id += 1;
            let created_at = now + chrono::Duration::seconds(1);
            state.runs.insert(
                0,
                MockRun {
                    record: ExternalRunRecord {
                        id: id.to_string(),
                        status: template.status,
                        conclusion: template.conclusion,
                        created_at,
                        updated_at: created_at,
                        url: Some(format!("https://ci.example.org/runs/{}", id)),
                    },
                    hidden_for_lists: template.hidden_for_lists,
                },
            );
        }

        Ok(())
    }

    async fn list_recent_runs(
        &self,
        _job_name: &str,
        limit: u32,
    ) -> Result<Vec<ExternalRunRecord>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;

        let mut visible = Vec::new();
        for run in state.runs.iter_mut() {
            if run.hidden_for_lists > 0 {
                run.hidden_for_lists -= 1;
                continue;
            }
            visible.push(run.record.clone());
        }
        visible.truncate(limit as usize);
        Ok(visible)
    }

    async fn get_run(&self, run_id: &str) -> Result<ExternalRunRecord> {
        let mut state = self.state.lock().unwrap();
        state.get_calls.push(run_id.to_string());

        if state.get_failures > 0 {
            state.get_failures -= 1;
            anyhow::bail!("connection reset while fetching run {}", run_id);
        }

        state
            .runs
            .iter()
            .find(|r| r.record.id == run_id)
            .map(|r| r.record.clone())
            .ok_or_else(|| anyhow::anyhow!("run {} not found", run_id))
    }
}

// =============================================================================
// Mock Alert Sink
// =============================================================================

#[derive(Debug, Clone)]
pub struct RecordedAlert {
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
}

#[derive(Default)]
pub struct MockAlertSink {
    alerts: Mutex<Vec<RecordedAlert>>,
    failing: Mutex<bool>,
}

impl MockAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery fail (the alert is still recorded).
    pub fn failing(self) -> Self {
        *self.failing.lock().unwrap() = true;
        self
    }

    pub fn alerts(&self) -> Vec<RecordedAlert> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn count(&self, severity: AlertSeverity) -> usize {
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.severity == severity)
            .count()
    }
}

#[async_trait]
impl BaseAlertSink for MockAlertSink {
    async fn notify(&self, severity: AlertSeverity, title: &str, message: &str) -> Result<()> {
        self.alerts.lock().unwrap().push(RecordedAlert {
            severity,
            title: title.to_string(),
            message: message.to_string(),
        });

        if *self.failing.lock().unwrap() {
            anyhow::bail!("alert webhook unreachable");
        }
        Ok(())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Mock services plus settings tuned for tests (no real sleeping).
pub struct TestDependencies {
    pub control_plane: Arc<MockControlPlane>,
    pub alerts: Arc<MockAlertSink>,
    pub clock: Arc<MockClock>,
    pub settings: OrchestratorSettings,
}

impl TestDependencies {
    pub fn new() -> Self {
        let clock = Arc::new(MockClock::new());
        Self {
            control_plane: Arc::new(MockControlPlane::new(clock.clone())),
            alerts: Arc::new(MockAlertSink::new()),
            clock,
            settings: OrchestratorSettings {
                job_name: "process-period.yml".to_string(),
                poll_interval: Duration::from_secs(60),
                discovery_delay: Duration::from_secs(5),
                discovery_interval: Duration::ZERO,
                discovery_attempts: 3,
                max_recovery_attempts: 2,
                max_job_duration: Duration::from_secs(3600),
                run_list_limit: 10,
            },
        }
    }

    /// Replace the control plane, e.g. with one built by `spawning_runs`.
    pub fn with_control_plane<F>(mut self, build: F) -> Self
    where
        F: FnOnce(MockControlPlane) -> MockControlPlane,
    {
        self.control_plane = Arc::new(build(MockControlPlane::new(self.clock.clone())));
        self
    }

    pub fn with_alerts(mut self, alerts: MockAlertSink) -> Self {
        self.alerts = Arc::new(alerts);
        self
    }

    pub fn with_settings<F>(mut self, tweak: F) -> Self
    where
        F: FnOnce(&mut OrchestratorSettings),
    {
        tweak(&mut self.settings);
        self
    }

    pub fn server_deps(&self) -> Arc<ServerDeps> {
        Arc::new(ServerDeps::new(
            self.control_plane.clone(),
            self.alerts.clone(),
            self.clock.clone(),
            Arc::new(OperatorCredentials::new([TEST_OPERATOR_TOKEN])),
            self.settings.clone(),
        ))
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
