// Common types and utilities shared across the application

pub mod auth;
pub mod restate_serde;
pub mod restate_types;

pub use auth::{AuthError, Operator, OperatorCredentials};
pub use restate_types::*;
