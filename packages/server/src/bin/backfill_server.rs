//! Backfill Orchestrator Server
//!
//! Runs the Restate endpoint hosting the `Backfill` virtual object plus a
//! small axum server for health probes.

use std::sync::Arc;

use actions_client::ActionsClient;
use anyhow::{Context, Result};
use restate_sdk::prelude::*;
use server_core::common::OperatorCredentials;
use server_core::domains::backfill::{BackfillObject, BackfillObjectImpl};
use server_core::kernel::{
    ActionsAdapter, BaseAlertSink, BaseControlPlane, LogAlertSink, ServerDeps, SystemClock,
    WebhookAlertSink,
};
use server_core::server::{serve_health, HealthState};
use server_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,restate_sdk=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Backfill Orchestrator");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Log masked env vars for troubleshooting
    fn mask_env(name: &str) {
        match std::env::var(name) {
            Ok(val) if val.is_empty() => tracing::info!("  {}: (empty)", name),
            Ok(val) => {
                let show = val.char_indices().nth(4).map(|(i, _)| i).unwrap_or(val.len());
                tracing::info!(
                    "  {}: {}{}  ({} chars)",
                    name,
                    &val[..show],
                    "*".repeat(val.len().saturating_sub(show)),
                    val.len()
                );
            }
            Err(_) => tracing::warn!("  {}: NOT SET", name),
        }
    }
    tracing::info!("Environment variables:");
    for name in &[
        "GITHUB_TOKEN", "GITHUB_OWNER", "GITHUB_REPO", "GITHUB_WORKFLOW", "GITHUB_REF",
        "OPERATOR_TOKENS", "ALERT_WEBHOOK_URL", "SERVER_PORT", "HEALTH_PORT",
        "RESTATE_IDENTITY_KEY",
    ] {
        mask_env(name);
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        workflow = %config.settings.job_name,
        git_ref = %config.github_ref,
        poll_interval_secs = config.settings.poll_interval.as_secs(),
        max_job_duration_secs = config.settings.max_job_duration.as_secs(),
        "Configuration loaded"
    );

    // Control plane (GitHub Actions)
    let actions = ActionsClient::with_timeout(
        config.github_token.clone(),
        config.github_owner.clone(),
        config.github_repo.clone(),
        config.http_timeout,
    )
    .context("Failed to build GitHub Actions client")?;
    let control_plane: Arc<dyn BaseControlPlane> = Arc::new(ActionsAdapter::new(
        Arc::new(actions),
        config.github_ref.clone(),
    ));

    // Alerts
    let alerts: Arc<dyn BaseAlertSink> = match &config.alert_webhook_url {
        Some(url) => {
            let http = reqwest::Client::builder()
                .timeout(config.http_timeout)
                .build()
                .context("Failed to build alert HTTP client")?;
            Arc::new(WebhookAlertSink::new(http, url.clone()))
        }
        None => {
            tracing::warn!("ALERT_WEBHOOK_URL not set, alerts only go to the log");
            Arc::new(LogAlertSink)
        }
    };

    let server_deps = Arc::new(ServerDeps::new(
        control_plane.clone(),
        alerts,
        Arc::new(SystemClock),
        Arc::new(OperatorCredentials::new(&config.operator_tokens)),
        config.settings.clone(),
    ));

    // Health server
    let health_state = HealthState {
        control_plane,
        job_name: config.settings.job_name.clone(),
    };
    let health_port = config.health_port;
    tokio::spawn(async move {
        if let Err(e) = serve_health(health_state, health_port).await {
            tracing::error!(error = %e, "Health server stopped");
        }
    });

    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!("Restate endpoint listening on {}", addr);

    let mut builder = Endpoint::builder();

    // Configure Restate request identity verification
    if let Some(identity_key) = &config.restate_identity_key {
        tracing::info!("Restate identity key configured");
        builder = builder
            .identity_key(identity_key)
            .context("Invalid Restate identity key")?;
    }

    let endpoint = builder
        .bind(BackfillObjectImpl::with_deps(server_deps).serve())
        .build();

    // Start HTTP server
    HttpServer::new(endpoint)
        .listen_and_serve(addr.parse()?)
        .await;

    Ok(())
}
