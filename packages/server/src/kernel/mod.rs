//! Kernel module - server infrastructure and dependencies.

pub mod alerts;
pub mod deps;
pub mod test_dependencies;
pub mod traits;

pub use alerts::{LogAlertSink, WebhookAlertSink};
pub use deps::{ActionsAdapter, ServerDeps, SystemClock};
pub use test_dependencies::TestDependencies;
pub use traits::*;
