//! Operator authentication for the orchestrator control API
//!
//! ```rust,ignore
//! use crate::common::auth::restate_auth::require_operator;
//!
//! // In a handler:
//! let _operator = require_operator(ctx.headers(), &self.deps.credentials)?;
//! ```
mod credentials;
mod errors;
pub mod restate_auth;

pub use credentials::{Operator, OperatorCredentials};
pub use errors::AuthError;
