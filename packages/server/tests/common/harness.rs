//! In-process stand-in for the Restate host.
//!
//! Keeps the stored record and the queue of scheduled wake-ups the way the
//! virtual object does, and drives `BackfillActor` directly against mock
//! dependencies. Scheduled wakes are never removed when the orchestrator is
//! paused or reset; they are delivered and must be ignored by the actor.

use chrono::{DateTime, Utc};
use server_core::domains::backfill::models::{OrchestratorState, RunStatus};
use server_core::domains::backfill::{BackfillActor, BackfillRequest, OrchestratorError, StatusView};
use server_core::kernel::test_dependencies::TEST_OPERATOR_TOKEN;
use server_core::kernel::{BaseClock, TestDependencies};
use test_context::AsyncTestContext;
use uuid::Uuid;

struct PendingWake {
    due: DateTime<Utc>,
    token: Uuid,
}

pub struct BackfillHarness {
    pub deps: TestDependencies,
    actor: BackfillActor,
    stored: Option<String>,
    pending: Vec<PendingWake>,
    /// Number of times a record was persisted.
    pub writes: usize,
}

fn init_tracing() {
    // Run tests with: RUST_LOG=debug cargo test -- --nocapture
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn operator_header() -> String {
    format!("Bearer {}", TEST_OPERATOR_TOKEN)
}

impl BackfillHarness {
    pub fn new(deps: TestDependencies) -> Self {
        init_tracing();
        let actor = BackfillActor::new(deps.server_deps());
        Self {
            deps,
            actor,
            stored: None,
            pending: Vec::new(),
            writes: 0,
        }
    }

    /// Replace the stored record, e.g. with one from an older schema.
    pub fn seed_record(&mut self, raw: &str) {
        self.stored = Some(raw.to_string());
    }

    pub fn record(&self) -> Option<&str> {
        self.stored.as_deref()
    }

    pub fn state(&self) -> OrchestratorState {
        OrchestratorState::from_record(self.stored.as_deref())
    }

    pub fn view(&self) -> StatusView {
        self.actor.view(self.stored.as_deref())
    }

    pub fn pending_wakes(&self) -> usize {
        self.pending.len()
    }

    /// Operator command with a valid credential.
    pub async fn send(&mut self, request: BackfillRequest) -> Result<StatusView, OrchestratorError> {
        let credential = operator_header();
        self.send_as(Some(&credential), request).await
    }

    pub async fn send_as(
        &mut self,
        credential: Option<&str>,
        request: BackfillRequest,
    ) -> Result<StatusView, OrchestratorError> {
        let outcome = self
            .actor
            .handle(self.stored.as_deref(), credential, request)
            .await?;

        if let Some(record) = outcome.record {
            self.stored = Some(record);
            self.writes += 1;
        }
        if let Some(wake) = outcome.wake {
            let after = chrono::Duration::from_std(wake.after).expect("wake delay out of range");
            self.pending.push(PendingWake {
                due: self.deps.clock.now() + after,
                token: wake.token,
            });
        }

        let violations = self.state().invariant_violations();
        assert!(violations.is_empty(), "invariants violated: {:?}", violations);

        Ok(outcome.view)
    }

    /// Deliver the earliest scheduled wake, advancing the clock to its due time.
    pub async fn fire_next_wake(&mut self) -> Option<StatusView> {
        let (index, _) = self
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, wake)| wake.due)?;
        let wake = self.pending.remove(index);

        let now = self.deps.clock.now();
        if wake.due > now {
            self.deps.clock.advance(wake.due - now);
        }

        let view = self
            .send_as(None, BackfillRequest::Wake { token: wake.token })
            .await
            .expect("wake handler failed");
        Some(view)
    }

    /// Deliver wakes until none are scheduled or `max_wakes` were delivered.
    pub async fn run_until_settled(&mut self, max_wakes: usize) -> StatusView {
        let mut delivered = 0;
        while delivered < max_wakes && self.fire_next_wake().await.is_some() {
            delivered += 1;
        }
        self.view()
    }

    /// Deliver wakes until the current job has a run id (or nothing is scheduled).
    pub async fn run_until_discovered(&mut self, max_wakes: usize) {
        for _ in 0..max_wakes {
            let discovered = self
                .state()
                .current_job
                .map(|job| job.is_discovered())
                .unwrap_or(false);
            if discovered || self.fire_next_wake().await.is_none() {
                return;
            }
        }
    }
}

impl AsyncTestContext for BackfillHarness {
    async fn setup() -> Self {
        Self::new(
            TestDependencies::new()
                .with_control_plane(|cp| cp.spawning_runs(RunStatus::InProgress, None)),
        )
    }
}
