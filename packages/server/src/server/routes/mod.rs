// HTTP routes
pub mod health;

pub use health::*;
