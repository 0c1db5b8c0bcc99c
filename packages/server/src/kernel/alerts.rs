use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use super::{AlertSeverity, BaseAlertSink};

const ALERT_SOURCE: &str = "backfill-orchestrator";

/// Generic webhook alert sink
/// Posts `{severity, title, message, source}` as JSON to a configured URL
pub struct WebhookAlertSink {
    client: Client,
    url: String,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    severity: AlertSeverity,
    title: &'a str,
    message: &'a str,
    source: &'a str,
}

impl WebhookAlertSink {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl BaseAlertSink for WebhookAlertSink {
    async fn notify(&self, severity: AlertSeverity, title: &str, message: &str) -> Result<()> {
        let payload = WebhookPayload {
            severity,
            title,
            message,
            source: ALERT_SOURCE,
        };

        info!(%severity, title, "Sending alert webhook");

        let response = self.client.post(&self.url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Alert webhook failed {}: {}", status, body);
            anyhow::bail!("Alert webhook error {}: {}", status, body);
        }

        Ok(())
    }
}

/// Alert sink used when no webhook is configured: alerts only reach the logs.
pub struct LogAlertSink;

#[async_trait]
impl BaseAlertSink for LogAlertSink {
    async fn notify(&self, severity: AlertSeverity, title: &str, message: &str) -> Result<()> {
        match severity {
            AlertSeverity::Critical => error!(%severity, title, message, "Alert"),
            AlertSeverity::Warning => warn!(%severity, title, message, "Alert"),
            AlertSeverity::Info => info!(%severity, title, message, "Alert"),
        }
        Ok(())
    }
}
