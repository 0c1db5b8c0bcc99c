//! Health server setup.
//!
//! The orchestrator API itself is served by the Restate endpoint; this axum
//! app only carries the liveness probe.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{extract::Extension, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::server::routes::{health_handler, HealthState};

pub fn build_health_app(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}

/// Serve the health app until the process exits.
pub async fn serve_health(state: HealthState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind health server on {}", addr))?;

    tracing::info!("Health server listening on {}", addr);
    axum::serve(listener, build_health_app(state))
        .await
        .context("Health server failed")
}
