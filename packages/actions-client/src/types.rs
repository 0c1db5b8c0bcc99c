use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body for `POST /repos/{owner}/{repo}/actions/workflows/{workflow}/dispatches`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDispatchInput<'a> {
    #[serde(rename = "ref")]
    pub git_ref: &'a str,
    pub inputs: &'a BTreeMap<String, String>,
}

/// Response wrapper for the workflow runs listing.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunList {
    pub total_count: u64,
    pub workflow_runs: Vec<WorkflowRun>,
}

/// GitHub Actions workflow run metadata.
///
/// `status` and `conclusion` are kept as the raw API strings; callers map them
/// onto their own vocabulary.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub name: Option<String>,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub event: Option<String>,
    pub head_branch: Option<String>,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub run_attempt: Option<u32>,
}
