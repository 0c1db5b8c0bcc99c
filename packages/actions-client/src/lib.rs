//! Pure GitHub Actions REST API client.
//!
//! A minimal client for the workflow endpoints of the GitHub REST API. Supports
//! triggering `workflow_dispatch` runs, listing recent runs of a workflow and
//! fetching a single run.
//!
//! Note that a workflow dispatch returns `204 No Content`: GitHub does not hand
//! back the id of the run it creates. Callers that need the run must find it
//! through [`ActionsClient::list_workflow_runs`].
//!
//! # Example
//!
//! ```rust,ignore
//! use actions_client::ActionsClient;
//!
//! let client = ActionsClient::new("ghp_token".into(), "octo".into(), "pipeline".into())?;
//!
//! let runs = client.list_workflow_runs("process-period.yml", 10).await?;
//! for run in &runs {
//!     println!("{} {:?}", run.id, run.status);
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{ActionsError, Result};
pub use types::{WorkflowRun, WorkflowRunList};

use std::collections::BTreeMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use types::WorkflowDispatchInput;

const BASE_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "backfill-orchestrator";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ActionsClient {
    client: reqwest::Client,
    token: String,
    owner: String,
    repo: String,
    base_url: String,
}

impl ActionsClient {
    pub fn new(token: String, owner: String, repo: String) -> Result<Self> {
        Self::with_timeout(token, owner, repo, DEFAULT_TIMEOUT)
    }

    /// Build a client whose every request is bounded by `timeout`.
    pub fn with_timeout(
        token: String,
        owner: String,
        repo: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            token,
            owner,
            repo,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the client at a different API root (GitHub Enterprise).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn repo_url(&self) -> String {
        format!("{}/repos/{}/{}", self.base_url, self.owner, self.repo)
    }

    /// Trigger a `workflow_dispatch` event. Returns once GitHub accepted the
    /// request; the run itself is created asynchronously.
    pub async fn dispatch_workflow(
        &self,
        workflow: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<()> {
        let url = format!("{}/actions/workflows/{}/dispatches", self.repo_url(), workflow);
        let body = WorkflowDispatchInput { git_ref, inputs };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ActionsError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        tracing::debug!(workflow, git_ref, "Workflow dispatch accepted");
        Ok(())
    }

    /// List the most recent `workflow_dispatch` runs of a workflow, newest first.
    pub async fn list_workflow_runs(
        &self,
        workflow: &str,
        per_page: u32,
    ) -> Result<Vec<WorkflowRun>> {
        let url = format!(
            "{}/actions/workflows/{}/runs?per_page={}&event=workflow_dispatch",
            self.repo_url(),
            workflow,
            per_page.clamp(1, 100)
        );

        let list: WorkflowRunList = self.get_json(&url).await?;
        Ok(list.workflow_runs)
    }

    /// Fetch a single workflow run by id.
    pub async fn get_workflow_run(&self, run_id: u64) -> Result<WorkflowRun> {
        let url = format!("{}/actions/runs/{}", self.repo_url(), run_id);

        match self.get_json(&url).await {
            Err(ActionsError::Api { status: 404, .. }) => Err(ActionsError::RunNotFound(run_id)),
            other => other,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ActionsError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }
}
