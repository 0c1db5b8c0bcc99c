pub mod error_log;
pub mod period;
pub mod run;
pub mod state;

pub use error_log::*;
pub use period::*;
pub use run::*;
pub use state::*;
