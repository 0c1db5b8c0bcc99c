pub mod alerts;
pub mod discovery;
pub mod dispatch;

pub use alerts::{notify_completed, notify_failed};
pub use discovery::{discover_run, select_run};
pub use dispatch::{dispatch_period, dispatch_params};
