//! Control API behavior: authentication, request validation, preconditions,
//! wake tokens and record loading.

mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use crate::common::{start_periods, start_range, BackfillHarness};
use server_core::domains::backfill::models::{OrchestratorStatus, RunConclusion, RunStatus};
use server_core::domains::backfill::BackfillRequest;
use server_core::kernel::test_dependencies::{MockAlertSink, TEST_OPERATOR_TOKEN};
use server_core::kernel::TestDependencies;
use test_context::test_context;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

// =============================================================================
// Authentication
// =============================================================================

#[test_context(BackfillHarness)]
#[tokio::test]
async fn missing_credentials_are_rejected_without_side_effects(h: &mut BackfillHarness) {
    let err = assert_err!(h.send_as(None, start_periods(&["202401"])).await);

    assert_eq!(err.status_code(), 401);
    assert_eq!(h.writes, 0);
    assert!(h.record().is_none());
    assert!(h.deps.control_plane.dispatch_calls().is_empty());
}

#[test_context(BackfillHarness)]
#[tokio::test]
async fn wrong_token_cannot_reset(h: &mut BackfillHarness) {
    assert_ok!(h.send(start_periods(&["202401"])).await);
    let record = h.record().map(str::to_string);

    let err = assert_err!(h.send_as(Some("Bearer not-the-token"), BackfillRequest::Reset).await);

    assert_eq!(err.status_code(), 401);
    assert_eq!(h.record().map(str::to_string), record);
    assert_eq!(h.state().status, OrchestratorStatus::Running);
}

#[test_context(BackfillHarness)]
#[tokio::test]
async fn basic_credentials_carry_the_token_as_password(h: &mut BackfillHarness) {
    let header = format!(
        "Basic {}",
        STANDARD.encode(format!("ops:{}", TEST_OPERATOR_TOKEN))
    );

    let view = assert_ok!(h.send_as(Some(&header), start_periods(&["202401"])).await);

    assert_eq!(view.state.status, OrchestratorStatus::Running);
}

// =============================================================================
// Request validation
// =============================================================================

#[test_context(BackfillHarness)]
#[tokio::test]
async fn malformed_start_requests_persist_nothing(h: &mut BackfillHarness) {
    let requests = vec![
        start_periods(&[]),
        start_periods(&["2024-01"]),
        start_periods(&["202413"]),
        start_periods(&["202401", "202402", "202401"]),
        start_range("202405-202401"),
        start_range("202401"),
        BackfillRequest::Start(Default::default()),
    ];

    for request in requests {
        let err = assert_err!(h.send(request).await);
        assert_eq!(err.status_code(), 400, "{}", err);
    }

    assert_eq!(h.writes, 0);
    assert!(h.deps.control_plane.dispatch_calls().is_empty());
}

#[test_context(BackfillHarness)]
#[tokio::test]
async fn range_start_expands_consecutive_months(h: &mut BackfillHarness) {
    let view = assert_ok!(h.send(start_range("202311-202402")).await);

    let periods: Vec<&str> = view.state.periods.iter().map(|p| p.as_str()).collect();
    assert_eq!(periods, vec!["202311", "202312", "202401", "202402"]);
    assert_eq!(h.deps.control_plane.dispatched_periods(), vec!["202311"]);
    assert_eq!(view.summary.total, 4);
    assert_eq!(view.summary.current_period.as_ref().map(|p| p.as_str()), Some("202311"));
}

// =============================================================================
// Preconditions
// =============================================================================

#[test_context(BackfillHarness)]
#[tokio::test]
async fn start_is_rejected_while_running_or_paused(h: &mut BackfillHarness) {
    assert_ok!(h.send(start_periods(&["202401", "202402"])).await);

    let err = assert_err!(h.send(start_periods(&["202405"])).await);
    assert_eq!(err.status_code(), 409);

    assert_ok!(h.send(BackfillRequest::Pause).await);
    let err = assert_err!(h.send(start_periods(&["202405"])).await);
    assert_eq!(err.status_code(), 409);

    let state = h.state();
    assert_eq!(state.current_period_index, 0);
    assert_eq!(state.periods.len(), 2);
    assert_eq!(h.deps.control_plane.dispatched_periods(), vec!["202401"]);
}

#[test_context(BackfillHarness)]
#[tokio::test]
async fn commands_outside_their_state_conflict(h: &mut BackfillHarness) {
    for request in [
        BackfillRequest::Pause,
        BackfillRequest::Resume,
        BackfillRequest::Retry,
    ] {
        let err = assert_err!(h.send(request).await);
        assert_eq!(err.status_code(), 409);
    }

    assert_ok!(h.send(start_periods(&["202401"])).await);
    let err = assert_err!(h.send(BackfillRequest::Resume).await);
    assert_eq!(err.status_code(), 409);
    let err = assert_err!(h.send(BackfillRequest::Retry).await);
    assert_eq!(err.status_code(), 409);
}

#[tokio::test]
async fn start_is_accepted_again_after_completion() {
    let deps = TestDependencies::new().with_control_plane(|cp| {
        cp.spawning_runs(RunStatus::Completed, Some(RunConclusion::Success))
    });
    let mut h = BackfillHarness::new(deps);

    assert_ok!(h.send(start_periods(&["202401"])).await);
    assert_eq!(h.run_until_settled(5).await.state.status, OrchestratorStatus::Completed);

    let view = assert_ok!(h.send(start_periods(&["202402"])).await);

    assert_eq!(view.state.status, OrchestratorStatus::Running);
    assert_eq!(view.state.periods.len(), 1);
    assert!(view.state.completed_periods.is_empty());
    assert!(view.state.errors.is_empty());
}

// =============================================================================
// Wake tokens
// =============================================================================

#[test_context(BackfillHarness)]
#[tokio::test]
async fn wake_with_unknown_token_is_a_no_op(h: &mut BackfillHarness) {
    assert_ok!(h.send(start_periods(&["202401"])).await);
    let writes = h.writes;
    let before = h.state();

    assert_ok!(
        h.send_as(None, BackfillRequest::Wake { token: Uuid::new_v4() })
            .await
    );

    assert_eq!(h.writes, writes);
    assert_eq!(h.state(), before);
    assert_eq!(h.deps.control_plane.list_calls(), 0);
}

#[test_context(BackfillHarness)]
#[tokio::test]
async fn reset_invalidates_pending_wakes(h: &mut BackfillHarness) {
    assert_ok!(h.send(start_periods(&["202401"])).await);
    let view = assert_ok!(h.send(BackfillRequest::Reset).await);
    assert_eq!(view.state.status, OrchestratorStatus::Idle);
    assert_eq!(h.pending_wakes(), 1);

    let view = h.run_until_settled(5).await;

    assert_eq!(view.state.status, OrchestratorStatus::Idle);
    assert!(view.state.periods.is_empty());
    assert_eq!(h.deps.control_plane.list_calls(), 0);
    assert_eq!(h.deps.control_plane.dispatch_calls().len(), 1);
}

#[test_context(BackfillHarness)]
#[tokio::test]
async fn duplicate_wake_delivery_runs_one_step(h: &mut BackfillHarness) {
    assert_ok!(h.send(start_periods(&["202401"])).await);
    let token = h.state().wake_token.expect("armed");

    assert_ok!(h.send_as(None, BackfillRequest::Wake { token }).await);
    let lists = h.deps.control_plane.list_calls();
    assert_ok!(h.send_as(None, BackfillRequest::Wake { token }).await);

    assert_eq!(h.deps.control_plane.list_calls(), lists);
}

// =============================================================================
// Record loading
// =============================================================================

#[test_context(BackfillHarness)]
#[tokio::test]
async fn record_from_older_schema_is_discarded(h: &mut BackfillHarness) {
    h.seed_record(
        r#"{"schema_version":1,"status":"running","periods":["202401"],"current_period_index":0}"#,
    );

    assert_eq!(h.view().state.status, OrchestratorStatus::Idle);

    let view = assert_ok!(h.send(start_periods(&["202402"])).await);
    assert_eq!(view.state.status, OrchestratorStatus::Running);
    assert_eq!(h.deps.control_plane.dispatched_periods(), vec!["202402"]);
}

#[test_context(BackfillHarness)]
#[tokio::test]
async fn status_is_read_only(h: &mut BackfillHarness) {
    assert_ok!(h.send(start_periods(&["202401", "202402"])).await);
    let writes = h.writes;

    let view = assert_ok!(h.send(BackfillRequest::Status).await);

    assert_eq!(h.writes, writes);
    assert_eq!(view.summary.status, OrchestratorStatus::Running);
    assert_eq!(view.summary.completed, 0);
    assert_eq!(view.summary.total, 2);
    assert_eq!(view.summary.progress, 0.0);
    assert_eq!(view.summary.elapsed_secs, Some(0));
}

// =============================================================================
// Alerts
// =============================================================================

#[tokio::test]
async fn alert_delivery_failure_does_not_change_the_outcome() {
    let deps = TestDependencies::new()
        .with_control_plane(|cp| {
            cp.spawning_runs(RunStatus::Completed, Some(RunConclusion::Success))
        })
        .with_alerts(MockAlertSink::new().failing());
    let mut h = BackfillHarness::new(deps);

    assert_ok!(h.send(start_periods(&["202401"])).await);
    let view = h.run_until_settled(5).await;

    assert_eq!(view.state.status, OrchestratorStatus::Completed);
    assert_eq!(h.deps.alerts.alerts().len(), 1);
    let alert = &h.deps.alerts.alerts()[0];
    assert!(alert.message.contains("Progress: 1/1"));
}
