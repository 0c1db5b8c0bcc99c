//! Single-writer wrapper around the state machine.
//!
//! The actor decodes the stored record, runs one request against a copy and
//! hands back the record to persist. A failed request yields no record, so a
//! handler either persists its whole effect or nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use super::errors::OrchestratorError;
use super::machine::{BackfillMachine, ScheduledWake};
use super::models::{expand_range, parse_period_list, OrchestratorState, Period, StateSummary};
use crate::kernel::ServerDeps;

/// Body of `start`: exactly one of an explicit list or a `YYYYMM-YYYYMM` range.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub periods: Option<Vec<String>>,
    #[serde(default)]
    pub range: Option<String>,
}

impl StartRequest {
    pub fn into_periods(self) -> Result<Vec<Period>, OrchestratorError> {
        match (self.periods, self.range) {
            (Some(list), None) => Ok(parse_period_list(&list)?),
            (None, Some(range)) => Ok(expand_range(&range)?),
            (Some(_), Some(_)) => Err(OrchestratorError::MalformedRequest(
                "give either periods or range, not both".to_string(),
            )),
            (None, None) => Err(OrchestratorError::MalformedRequest(
                "periods or range is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub enum BackfillRequest {
    Status,
    Start(StartRequest),
    Pause,
    Resume,
    Retry,
    Reset,
    /// Self-scheduled; authenticated by its token rather than an operator credential.
    Wake { token: Uuid },
}

impl BackfillRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Start(_) => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Retry => "retry",
            Self::Reset => "reset",
            Self::Wake { .. } => "wake",
        }
    }

    fn requires_operator(&self) -> bool {
        !matches!(self, Self::Wake { .. })
    }
}

/// Full state plus derived progress, returned by every handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusView {
    pub state: OrchestratorState,
    pub summary: StateSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorOutcome {
    /// Record to persist; `None` when the request changed nothing.
    pub record: Option<String>,
    pub view: StatusView,
    pub wake: Option<ScheduledWake>,
}

pub struct BackfillActor {
    deps: Arc<ServerDeps>,
}

impl BackfillActor {
    pub fn new(deps: Arc<ServerDeps>) -> Self {
        Self { deps }
    }

    /// Read-only view of a stored record.
    pub fn view(&self, stored: Option<&str>) -> StatusView {
        let state = OrchestratorState::from_record(stored);
        self.view_of(state)
    }

    fn view_of(&self, state: OrchestratorState) -> StatusView {
        let summary = state.summary(self.deps.clock.now());
        StatusView { state, summary }
    }

    /// Run one request against the stored record.
    ///
    /// `credential` is the raw `Authorization`-style header of the caller; it
    /// is checked for every request except `wake`.
    pub async fn handle(
        &self,
        stored: Option<&str>,
        credential: Option<&str>,
        request: BackfillRequest,
    ) -> Result<ActorOutcome, OrchestratorError> {
        let command = request.name();
        let is_reset = matches!(request, BackfillRequest::Reset);
        if request.requires_operator() {
            let operator = self.deps.credentials.verify_header(credential)?;
            debug!(command, operator = ?operator.label, "Operator authenticated");
        }

        let loaded = OrchestratorState::from_record(stored);
        let mut state = loaded.clone();
        let machine = BackfillMachine::new(&self.deps);

        let wake = match request {
            BackfillRequest::Status => None,
            BackfillRequest::Start(body) => {
                let periods = body.into_periods()?;
                machine.start(&mut state, periods).await?
            }
            BackfillRequest::Pause => {
                machine.pause(&mut state)?;
                None
            }
            BackfillRequest::Resume => machine.resume(&mut state).await?,
            BackfillRequest::Retry => machine.retry(&mut state).await?,
            BackfillRequest::Reset => {
                machine.reset(&mut state);
                None
            }
            BackfillRequest::Wake { token } => machine.wake(&mut state, token).await?,
        };

        let violations = state.invariant_violations();
        if !violations.is_empty() {
            error!(command, ?violations, "Orchestrator invariants violated");
        }

        // Reset always rewrites so an undecodable record is replaced on disk.
        let changed = state != loaded || is_reset;
        let record = if changed {
            Some(state.to_record()?)
        } else {
            None
        };

        Ok(ActorOutcome {
            record,
            view: self.view_of(state),
            wake,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::backfill::models::OrchestratorStatus;
    use crate::kernel::test_dependencies::TEST_OPERATOR_TOKEN;
    use crate::kernel::TestDependencies;

    fn bearer() -> String {
        format!("Bearer {}", TEST_OPERATOR_TOKEN)
    }

    #[test]
    fn test_start_request_requires_exactly_one_source() {
        let both = StartRequest {
            periods: Some(vec!["202401".to_string()]),
            range: Some("202401-202402".to_string()),
        };
        assert!(both.into_periods().is_err());
        assert!(StartRequest::default().into_periods().is_err());

        let range = StartRequest {
            periods: None,
            range: Some("202311-202402".to_string()),
        };
        assert_eq!(range.into_periods().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_unauthenticated_request_persists_nothing() {
        let test = TestDependencies::new();
        let actor = BackfillActor::new(test.server_deps());

        let err = actor
            .handle(None, Some("Bearer wrong"), BackfillRequest::Reset)
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 401);
        assert!(test.control_plane.dispatch_calls().is_empty());
    }

    #[tokio::test]
    async fn test_status_does_not_write() {
        let test = TestDependencies::new();
        let actor = BackfillActor::new(test.server_deps());

        let outcome = actor
            .handle(None, Some(&bearer()), BackfillRequest::Status)
            .await
            .unwrap();

        assert!(outcome.record.is_none());
        assert!(outcome.wake.is_none());
        assert_eq!(outcome.view.state.status, OrchestratorStatus::Idle);
    }

    #[tokio::test]
    async fn test_wake_skips_operator_check() {
        let test = TestDependencies::new();
        let actor = BackfillActor::new(test.server_deps());

        let outcome = actor
            .handle(None, None, BackfillRequest::Wake { token: Uuid::new_v4() })
            .await
            .unwrap();

        assert!(outcome.record.is_none());
    }

    #[tokio::test]
    async fn test_malformed_start_persists_nothing() {
        let test = TestDependencies::new();
        let actor = BackfillActor::new(test.server_deps());
        let request = BackfillRequest::Start(StartRequest {
            periods: Some(vec!["202401".to_string(), "202401".to_string()]),
            range: None,
        });

        let err = actor.handle(None, Some(&bearer()), request).await.unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert!(test.control_plane.dispatch_calls().is_empty());
    }

    #[tokio::test]
    async fn test_reset_rewrites_undecodable_record() {
        let test = TestDependencies::new();
        let actor = BackfillActor::new(test.server_deps());

        let outcome = actor
            .handle(Some("not json"), Some(&bearer()), BackfillRequest::Reset)
            .await
            .unwrap();

        let record = outcome.record.unwrap();
        assert_eq!(
            OrchestratorState::from_record(Some(&record)),
            OrchestratorState::default()
        );
    }
}
