//! Thin GitHub REST client.
//!
//! Covers only the endpoints the provider needs: deploy key registration and
//! removal. The helpers at the bottom are shared with the App authenticator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Response;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::GithubApiError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("sidecred-github/", env!("CARGO_PKG_VERSION"));

// ── Types ────────────────────────────────────────────────────

/// Body of `POST /repos/{owner}/{repo}/keys`.
#[derive(Debug, Clone, Serialize)]
pub struct NewDeployKey {
    pub key: String,
    pub title: String,
    pub read_only: bool,
}

/// A deploy key as GitHub reports it after registration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployKey {
    pub id: i64,
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub read_only: bool,
    pub created_at: DateTime<Utc>,
}

/// Repository key registry.
#[async_trait]
pub trait RepositoriesApi: Send + Sync {
    async fn create_key(
        &self,
        owner: &str,
        repo: &str,
        key: &NewDeployKey,
    ) -> Result<DeployKey, GithubApiError>;

    /// Errors with `is_not_found()` when the key no longer exists.
    async fn delete_key(&self, owner: &str, repo: &str, key_id: i64) -> Result<(), GithubApiError>;
}

/// Builds a registry client authenticated with an installation token.
pub type ReposClientFactory = Arc<dyn Fn(&SecretString) -> Arc<dyn RepositoriesApi> + Send + Sync>;

// ── Client ───────────────────────────────────────────────────

pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl GithubClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, token: SecretString) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Default `ReposClientFactory`: one client per exchanged token, sharing
    /// the underlying connection pool.
    pub fn factory(http: reqwest::Client, base_url: impl Into<String>) -> ReposClientFactory {
        let base_url = base_url.into();
        Arc::new(move |token: &SecretString| -> Arc<dyn RepositoriesApi> {
            Arc::new(GithubClient::new(
                http.clone(),
                base_url.clone(),
                SecretString::new(token.expose_secret().clone()),
            ))
        })
    }

    fn keys_url(&self, owner: &str, repo: &str) -> String {
        format!(
            "{}/repos/{}/{}/keys",
            self.base_url,
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        )
    }
}

impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RepositoriesApi for GithubClient {
    async fn create_key(
        &self,
        owner: &str,
        repo: &str,
        key: &NewDeployKey,
    ) -> Result<DeployKey, GithubApiError> {
        let resp = self
            .http
            .post(self.keys_url(owner, repo))
            .bearer_auth(self.token.expose_secret())
            .json(key)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn delete_key(&self, owner: &str, repo: &str, key_id: i64) -> Result<(), GithubApiError> {
        let url = format!("{}/{}", self.keys_url(owner, repo), key_id);
        let resp = self
            .http
            .delete(url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

// ── HTTP helpers ─────────────────────────────────────────────

/// HTTP client preconfigured for the GitHub REST API. `timeout` bounds each
/// request end to end; `None` leaves deadlines to the caller.
pub fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
    headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

    let mut builder = reqwest::Client::builder()
        .use_rustls_tls()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(5));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Turn a non-2xx response into `GithubApiError::Status`.
pub(crate) async fn check(resp: Response) -> Result<Response, GithubApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(b) => b.message,
        Err(_) => body.chars().take(200).collect(),
    };
    Err(GithubApiError::Status { status, message })
}

pub(crate) async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, GithubApiError> {
    let body = check(resp).await?.bytes().await?;
    serde_json::from_slice(&body).map_err(GithubApiError::Decode)
}
