//! Bounded error history kept on the orchestrator state.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Period;

/// Most recent entries retained; older ones are evicted first.
pub const MAX_ERRORS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The dispatch call itself failed; no run was started.
    TriggerError,
    /// No run could be correlated with the dispatch within the recovery bound.
    DiscoveryExhausted,
    /// The run finished with a conclusion other than success.
    RunFailure,
    /// The run did not reach a terminal conclusion within the duration budget.
    OrchestratorTimeout,
    /// A status poll failed in transport; retried on the next wake.
    PollError,
}

impl ErrorKind {
    /// Whether this kind moves the orchestrator into `failed`.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::PollError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TriggerError => "TriggerError",
            Self::DiscoveryExhausted => "DiscoveryExhausted",
            Self::RunFailure => "RunFailure",
            Self::OrchestratorTimeout => "OrchestratorTimeout",
            Self::PollError => "PollError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default)]
    pub period: Option<Period>,
    pub timestamp: DateTime<Utc>,
}

/// FIFO ring buffer capped at [`MAX_ERRORS`]. Serialized as a plain list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "VecDeque<ErrorEntry>", into = "VecDeque<ErrorEntry>")]
pub struct ErrorLog {
    entries: VecDeque<ErrorEntry>,
}

impl ErrorLog {
    pub fn push(&mut self, entry: ErrorEntry) {
        while self.entries.len() >= MAX_ERRORS {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&ErrorEntry> {
        self.entries.back()
    }

    pub fn count_of(&self, kind: ErrorKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }
}

impl From<VecDeque<ErrorEntry>> for ErrorLog {
    fn from(mut entries: VecDeque<ErrorEntry>) -> Self {
        while entries.len() > MAX_ERRORS {
            entries.pop_front();
        }
        Self { entries }
    }
}

impl From<ErrorLog> for VecDeque<ErrorEntry> {
    fn from(log: ErrorLog) -> Self {
        log.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(i: usize) -> ErrorEntry {
        ErrorEntry {
            kind: ErrorKind::PollError,
            message: format!("error {}", i),
            period: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_push_evicts_oldest_first() {
        let mut log = ErrorLog::default();
        for i in 0..MAX_ERRORS + 5 {
            log.push(entry(i));
        }

        assert_eq!(log.len(), MAX_ERRORS);
        assert_eq!(log.iter().next().unwrap().message, "error 5");
        assert_eq!(
            log.latest().unwrap().message,
            format!("error {}", MAX_ERRORS + 4)
        );
    }

    #[test]
    fn test_deserialize_recaps_oversized_history() {
        let entries: Vec<ErrorEntry> = (0..MAX_ERRORS + 3).map(entry).collect();
        let json = serde_json::to_string(&entries).unwrap();

        let log: ErrorLog = serde_json::from_str(&json).unwrap();
        assert_eq!(log.len(), MAX_ERRORS);
        assert_eq!(log.iter().next().unwrap().message, "error 3");
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let mut log = ErrorLog::default();
        log.push(entry(0));
        let value = serde_json::to_value(&log).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["kind"], "PollError");
    }
}
