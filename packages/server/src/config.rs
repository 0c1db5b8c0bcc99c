use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::backfill::OrchestratorSettings;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: String,
    pub github_owner: String,
    pub github_repo: String,
    pub github_ref: String,
    /// Accepted operator tokens (comma-separated in `OPERATOR_TOKENS`)
    pub operator_tokens: Vec<String>,
    pub alert_webhook_url: Option<String>,
    pub server_port: u16,
    pub health_port: u16,
    pub restate_identity_key: Option<String>,
    pub http_timeout: Duration,
    pub settings: OrchestratorSettings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let operator_tokens = parse_tokens(
            &env::var("OPERATOR_TOKENS").context("OPERATOR_TOKENS must be set")?,
        );
        if operator_tokens.is_empty() {
            anyhow::bail!("OPERATOR_TOKENS must contain at least one token");
        }

        let defaults = OrchestratorSettings::default();
        let settings = OrchestratorSettings {
            job_name: env::var("GITHUB_WORKFLOW").unwrap_or(defaults.job_name),
            poll_interval: secs_or("POLL_INTERVAL_SECS", defaults.poll_interval)?,
            discovery_delay: secs_or("DISCOVERY_DELAY_SECS", defaults.discovery_delay)?,
            discovery_interval: secs_or("DISCOVERY_INTERVAL_SECS", defaults.discovery_interval)?,
            discovery_attempts: parse_or("DISCOVERY_ATTEMPTS", defaults.discovery_attempts)?,
            max_recovery_attempts: parse_or(
                "MAX_RECOVERY_ATTEMPTS",
                defaults.max_recovery_attempts,
            )?,
            max_job_duration: secs_or("MAX_JOB_DURATION_SECS", defaults.max_job_duration)?,
            run_list_limit: parse_or("RUN_LIST_LIMIT", defaults.run_list_limit)?,
        };

        Ok(Self {
            github_token: env::var("GITHUB_TOKEN").context("GITHUB_TOKEN must be set")?,
            github_owner: env::var("GITHUB_OWNER").context("GITHUB_OWNER must be set")?,
            github_repo: env::var("GITHUB_REPO").context("GITHUB_REPO must be set")?,
            github_ref: env::var("GITHUB_REF").unwrap_or_else(|_| "main".to_string()),
            operator_tokens,
            alert_webhook_url: env::var("ALERT_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            server_port: parse_or("SERVER_PORT", 9080)?,
            health_port: parse_or("HEALTH_PORT", 8081)?,
            restate_identity_key: env::var("RESTATE_IDENTITY_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            http_timeout: secs_or("HTTP_TIMEOUT_SECS", Duration::from_secs(30))?,
            settings,
        })
    }
}

fn parse_tokens(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}

fn secs_or(key: &str, default: Duration) -> Result<Duration> {
    parse_or(key, default.as_secs()).map(Duration::from_secs)
}
