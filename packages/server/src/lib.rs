// Backfill Orchestrator - Core
//
// Drives a long-running historical backfill one period at a time through an
// external CI control plane. The orchestrator is a Restate virtual object;
// all orchestration logic lives in domains/backfill and talks to the outside
// world only through the kernel traits.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
