use thiserror::Error;

use crate::common::AuthError;
use crate::domains::backfill::models::{OrchestratorStatus, PeriodError};

/// Errors a handler returns instead of a new state. Nothing is persisted when
/// a handler fails.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error("Unknown orchestrator instance '{0}'")]
    UnknownInstance(String),

    #[error("Cannot {command} while orchestrator is {status}")]
    InvalidTransition {
        command: &'static str,
        status: OrchestratorStatus,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// HTTP-equivalent status code surfaced to the caller.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::UnknownInstance(_) => 404,
            Self::InvalidTransition { .. } => 409,
            Self::Internal(_) => 500,
        }
    }
}

impl From<PeriodError> for OrchestratorError {
    fn from(e: PeriodError) -> Self {
        Self::MalformedRequest(e.to_string())
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("state serialization failed: {}", e))
    }
}
