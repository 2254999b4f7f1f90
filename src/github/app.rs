//! GitHub App authentication: JWT signing and installation token exchange.
//!
//! Workflow for every exchange:
//! 1. Sign a short-lived RS256 JWT with the App's private key
//! 2. Page through `GET /app/installations` to find the owner's installation
//! 3. `POST /app/installations/{id}/access_tokens` with the requested scopes
//!
//! Nothing is cached between calls.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::client::read_json;
use super::permissions::Permissions;
use crate::errors::AuthError;

const INSTALLATIONS_PER_PAGE: usize = 100;
/// Upper bound on installation pages walked per lookup.
const MAX_INSTALLATION_PAGES: usize = 50;

/// A scoped installation access token and when GitHub will expire it.
#[derive(Debug)]
pub struct InstallationToken {
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
}

/// Exchanges the App identity for installation tokens.
#[async_trait]
pub trait AppAuthenticator: Send + Sync {
    async fn exchange(
        &self,
        owner: &str,
        permissions: &Permissions,
    ) -> Result<InstallationToken, AuthError>;
}

// ── Wire types ───────────────────────────────────────────────

#[derive(Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Deserialize)]
struct Installation {
    id: u64,
    account: Option<Account>,
}

#[derive(Deserialize)]
struct Account {
    login: String,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    permissions: &'a Permissions,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

// ── GithubApp ────────────────────────────────────────────────

pub struct GithubApp {
    app_id: u64,
    key: EncodingKey,
    http: reqwest::Client,
    base_url: String,
}

impl GithubApp {
    /// Fails if `private_key_pem` is not an RSA private key.
    pub fn new(
        app_id: u64,
        private_key_pem: &SecretString,
        http: reqwest::Client,
        base_url: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.expose_secret().as_bytes())?;
        Ok(Self {
            app_id,
            key,
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    /// App JWT. Backdated a minute against clock drift; GitHub rejects
    /// lifetimes over ten minutes.
    fn jwt(&self) -> Result<SecretString, AuthError> {
        let now = Utc::now();
        let claims = AppClaims {
            iat: (now - Duration::seconds(60)).timestamp(),
            exp: (now + Duration::minutes(9)).timestamp(),
            iss: self.app_id.to_string(),
        };
        let jwt = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)?;
        Ok(SecretString::new(jwt))
    }

    async fn find_installation(&self, jwt: &SecretString, owner: &str) -> Result<u64, AuthError> {
        let url = format!("{}/app/installations", self.base_url);
        let mut page: usize = 1;
        loop {
            let resp = self
                .http
                .get(&url)
                .bearer_auth(jwt.expose_secret())
                .query(&[("per_page", INSTALLATIONS_PER_PAGE), ("page", page)])
                .send()
                .await
                .map_err(|e| AuthError::ListInstallations(e.into()))?;
            let installations: Vec<Installation> =
                read_json(resp).await.map_err(AuthError::ListInstallations)?;

            let found = installations.iter().find(|i| {
                i.account
                    .as_ref()
                    .is_some_and(|a| a.login.eq_ignore_ascii_case(owner))
            });
            if let Some(installation) = found {
                return Ok(installation.id);
            }
            if installations.len() < INSTALLATIONS_PER_PAGE || page >= MAX_INSTALLATION_PAGES {
                return Err(AuthError::InstallationNotFound(owner.to_string()));
            }
            page += 1;
        }
    }
}

#[async_trait]
impl AppAuthenticator for GithubApp {
    async fn exchange(
        &self,
        owner: &str,
        permissions: &Permissions,
    ) -> Result<InstallationToken, AuthError> {
        let jwt = self.jwt()?;
        let installation_id = self.find_installation(&jwt, owner).await?;

        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.base_url, installation_id
        );
        let resp = self
            .http
            .post(url)
            .bearer_auth(jwt.expose_secret())
            .json(&TokenRequest { permissions })
            .send()
            .await
            .map_err(|e| AuthError::CreateToken(e.into()))?;
        let parsed: TokenResponse = read_json(resp).await.map_err(AuthError::CreateToken)?;

        tracing::debug!(
            owner = %owner,
            installation_id,
            expires_at = %parsed.expires_at,
            "Exchanged installation access token"
        );

        Ok(InstallationToken {
            token: SecretString::new(parsed.token),
            expires_at: parsed.expires_at,
        })
    }
}

impl std::fmt::Debug for GithubApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubApp")
            .field("app_id", &self.app_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::client::http_client;
    use crate::github::keys::{KeyPairGenerator, RsaKeyPairGenerator};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app(server: &MockServer) -> GithubApp {
        let pair = RsaKeyPairGenerator::default().generate().unwrap();
        GithubApp::new(7, &pair.private_key_pem, http_client(None).unwrap(), server.uri()).unwrap()
    }

    #[test]
    fn test_rejects_non_rsa_key() {
        let err = GithubApp::new(
            7,
            &SecretString::new("not a pem".into()),
            reqwest::Client::new(),
            "http://localhost",
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::Jwt(_)));
    }

    #[tokio::test]
    async fn test_exchange_finds_installation_and_requests_scopes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 11, "account": {"login": "someone-else"}},
                {"id": 22, "account": {"login": "Acme"}},
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/app/installations/22/access_tokens"))
            .and(body_json(serde_json::json!({
                "permissions": {"administration": "write", "metadata": "read"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "token": "ghs_scoped",
                "expires_at": "2024-03-01T13:00:00Z",
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let token = app(&mock_server)
            .exchange("acme", &Permissions::administration())
            .await
            .unwrap();

        assert_eq!(token.token.expose_secret(), "ghs_scoped");
        assert_eq!(token.expires_at.to_rfc3339(), "2024-03-01T13:00:00+00:00");
    }

    #[tokio::test]
    async fn test_exchange_without_installation_fails() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 11, "account": {"login": "someone-else"}},
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&mock_server)
            .await;

        let err = app(&mock_server)
            .exchange("acme", &Permissions::automation())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InstallationNotFound(ref o) if o == "acme"));
    }

    #[tokio::test]
    async fn test_installation_lookup_stops_after_page_limit() {
        let mock_server = MockServer::start().await;

        // Ignores `page` and always answers with a full page of other accounts.
        let full_page: Vec<_> = (0..INSTALLATIONS_PER_PAGE)
            .map(|i| serde_json::json!({"id": i, "account": {"login": format!("other-{i}")}}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_page))
            .expect(MAX_INSTALLATION_PAGES as u64)
            .mount(&mock_server)
            .await;

        let err = app(&mock_server)
            .exchange("acme", &Permissions::automation())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InstallationNotFound(ref o) if o == "acme"));
    }

    #[tokio::test]
    async fn test_exchange_surfaces_token_endpoint_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 22, "account": {"login": "acme"}},
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/app/installations/22/access_tokens"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "message": "The permissions requested are not granted to this installation.",
            })))
            .mount(&mock_server)
            .await;

        let err = app(&mock_server)
            .exchange("acme", &Permissions::administration())
            .await
            .unwrap_err();
        match err {
            AuthError::CreateToken(inner) => {
                assert_eq!(inner.status(), Some(reqwest::StatusCode::UNPROCESSABLE_ENTITY));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_exchange_surfaces_bad_app_credentials() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "A JSON web token could not be decoded",
            })))
            .mount(&mock_server)
            .await;

        let err = app(&mock_server)
            .exchange("acme", &Permissions::automation())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ListInstallations(_)));
        assert!(err.to_string().contains("401"));
    }
}
