//! Backfill domain - drives one period job at a time through an external
//! control plane until every requested period has succeeded.
//!
//! Architecture:
//!   Restate virtual object → BackfillActor (load / persist) → BackfillMachine → activities

pub mod activities;
pub mod actor;
pub mod errors;
pub mod machine;
pub mod models;
pub mod restate;
pub mod settings;

pub use actor::{ActorOutcome, BackfillActor, BackfillRequest, StartRequest, StatusView};
pub use errors::OrchestratorError;
pub use machine::{BackfillMachine, ScheduledWake};
pub use models::{OrchestratorState, OrchestratorStatus, Period};
pub use restate::*;
pub use settings::OrchestratorSettings;
