use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use secrecy::SecretString;

use crate::github::client::{http_client, GithubClient, DEFAULT_API_URL};
use crate::github::provider::DEFAULT_DEPLOY_KEY_ROTATION_DAYS;
use crate::github::{GithubApp, GithubProvider};

/// Ten years.
const MAX_DEPLOY_KEY_ROTATION_HOURS: i64 = 24 * 365 * 10;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug)]
pub struct Config {
    pub app_id: u64,
    /// PEM private key of the GitHub App. Redacted from `Debug`.
    pub private_key: SecretString,
    /// REST API root; override for GitHub Enterprise (`https://host/api/v3`).
    pub api_url: String,
    pub deploy_key_rotation_interval: chrono::Duration,
    /// Per-request deadline for calls to GitHub.
    pub http_timeout: Duration,
}

impl Config {
    /// Wire the App authenticator and REST client into a provider.
    pub fn build_provider(&self) -> anyhow::Result<GithubProvider> {
        let http = http_client(Some(self.http_timeout)).context("failed to build HTTP client")?;
        let app = GithubApp::new(self.app_id, &self.private_key, http.clone(), &self.api_url)
            .context("invalid GitHub App private key")?;

        Ok(
            GithubProvider::new(Arc::new(app), GithubClient::factory(http, &self.api_url))
                .with_deploy_key_rotation_interval(self.deploy_key_rotation_interval),
        )
    }
}

/// Load configuration from the process environment (and `.env`, if present).
pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a `Config` from an arbitrary variable source.
pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
    let app_id = var("GITHUB_APP_ID")
        .context("GITHUB_APP_ID is not set")?
        .trim()
        .parse::<u64>()
        .context("GITHUB_APP_ID must be a numeric App ID")?;

    let private_key = match (var("GITHUB_APP_PRIVATE_KEY"), var("GITHUB_APP_PRIVATE_KEY_PATH")) {
        (Some(pem), _) if !pem.trim().is_empty() => pem,
        (_, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read GITHUB_APP_PRIVATE_KEY_PATH ({})", path))?,
        _ => anyhow::bail!("one of GITHUB_APP_PRIVATE_KEY or GITHUB_APP_PRIVATE_KEY_PATH must be set"),
    };

    let rotation_interval = match var("SIDECRED_DEPLOY_KEY_ROTATION_HOURS") {
        Some(v) => v
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|h| (1..=MAX_DEPLOY_KEY_ROTATION_HOURS).contains(h))
            .and_then(chrono::Duration::try_hours)
            .with_context(|| {
                format!(
                    "SIDECRED_DEPLOY_KEY_ROTATION_HOURS must be between 1 and {} hours",
                    MAX_DEPLOY_KEY_ROTATION_HOURS
                )
            })?,
        None => chrono::Duration::days(DEFAULT_DEPLOY_KEY_ROTATION_DAYS),
    };

    let http_timeout_secs = match var("SIDECRED_HTTP_TIMEOUT_SECS") {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|s| *s > 0)
            .context("SIDECRED_HTTP_TIMEOUT_SECS must be a positive number of seconds")?,
        None => DEFAULT_HTTP_TIMEOUT_SECS,
    };

    Ok(Config {
        app_id,
        private_key: SecretString::new(private_key),
        api_url: var("GITHUB_API_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.into()),
        deploy_key_rotation_interval: rotation_interval,
        http_timeout: Duration::from_secs(http_timeout_secs),
    })
}
