// HTTP server setup (Axum health endpoint next to the Restate endpoint)
pub mod app;
pub mod routes;

pub use app::*;
pub use routes::*;
