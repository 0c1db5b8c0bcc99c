//! Server dependencies for the orchestrator (using traits for testability)
//!
//! This module provides the central dependency container used by the backfill
//! domain. All external services use trait abstractions to enable testing.

use std::collections::BTreeMap;
use std::sync::Arc;

use actions_client::{ActionsClient, WorkflowRun};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::OperatorCredentials;
use crate::domains::backfill::models::{ExternalRunRecord, RunConclusion, RunStatus};
use crate::domains::backfill::OrchestratorSettings;
use crate::kernel::{BaseAlertSink, BaseClock, BaseControlPlane};

// =============================================================================
// ActionsClient Adapter (implements BaseControlPlane trait)
// =============================================================================

/// Wrapper around ActionsClient that implements BaseControlPlane.
///
/// Job names are workflow file names; every dispatch targets `git_ref`.
pub struct ActionsAdapter {
    client: Arc<ActionsClient>,
    git_ref: String,
}

impl ActionsAdapter {
    pub fn new(client: Arc<ActionsClient>, git_ref: String) -> Self {
        Self { client, git_ref }
    }
}

impl From<WorkflowRun> for ExternalRunRecord {
    fn from(run: WorkflowRun) -> Self {
        Self {
            id: run.id.to_string(),
            status: run
                .status
                .as_deref()
                .map(RunStatus::from)
                .unwrap_or(RunStatus::Unknown),
            conclusion: run.conclusion.as_deref().map(RunConclusion::from),
            created_at: run.created_at,
            updated_at: run.updated_at,
            url: Some(run.html_url),
        }
    }
}

#[async_trait]
impl BaseControlPlane for ActionsAdapter {
    async fn dispatch(&self, job_name: &str, params: &BTreeMap<String, String>) -> Result<()> {
        self.client
            .dispatch_workflow(job_name, &self.git_ref, params)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn list_recent_runs(
        &self,
        job_name: &str,
        limit: u32,
    ) -> Result<Vec<ExternalRunRecord>> {
        let runs = self
            .client
            .list_workflow_runs(job_name, limit)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(runs.into_iter().map(ExternalRunRecord::from).collect())
    }

    async fn get_run(&self, run_id: &str) -> Result<ExternalRunRecord> {
        let id: u64 = run_id
            .parse()
            .with_context(|| format!("Invalid workflow run id '{}'", run_id))?;
        let run = self
            .client
            .get_workflow_run(id)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(run.into())
    }
}

// =============================================================================
// System clock
// =============================================================================

pub struct SystemClock;

impl BaseClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Dependencies shared by the orchestrator handlers
#[derive(Clone)]
pub struct ServerDeps {
    pub control_plane: Arc<dyn BaseControlPlane>,
    pub alerts: Arc<dyn BaseAlertSink>,
    pub clock: Arc<dyn BaseClock>,
    /// Operator tokens accepted by the control API
    pub credentials: Arc<OperatorCredentials>,
    pub settings: OrchestratorSettings,
}

impl ServerDeps {
    pub fn new(
        control_plane: Arc<dyn BaseControlPlane>,
        alerts: Arc<dyn BaseAlertSink>,
        clock: Arc<dyn BaseClock>,
        credentials: Arc<OperatorCredentials>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            control_plane,
            alerts,
            clock,
            credentials,
            settings,
        }
    }
}
