use thiserror::Error;

pub type Result<T> = std::result::Result<T, ActionsError>;

#[derive(Debug, Error)]
pub enum ActionsError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Workflow run {0} not found")]
    RunNotFound(u64),
}
