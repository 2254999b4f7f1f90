use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::app::AppAuthenticator;
use super::client::{NewDeployKey, ReposClientFactory};
use super::keys::{KeyPairGenerator, RsaKeyPairGenerator};
use super::permissions::Permissions;
use crate::errors::{KeyGenError, ProviderError};
use crate::models::{
    AccessTokenRequestConfig, Credential, DeployKeyRequestConfig, Metadata, Request, RequestType,
    Resource, KEY_ID,
};
use crate::provider::{Issued, Provider, ProviderType};

pub const DEFAULT_DEPLOY_KEY_ROTATION_DAYS: i64 = 7;

const ACCESS_TOKEN_DESCRIPTION: &str = "Github access token managed by sidecred.";
const DEPLOY_KEY_DESCRIPTION: &str = "Github deploy key managed by sidecred.";

/// `Provider` for GitHub installation access tokens and deploy keys.
///
/// Built once with its collaborators injected; every call re-authenticates
/// and shares no mutable state with other calls.
pub struct GithubProvider {
    app: Arc<dyn AppAuthenticator>,
    keys: Arc<dyn KeyPairGenerator>,
    repos_client_factory: ReposClientFactory,
    key_rotation_interval: Duration,
}

impl GithubProvider {
    pub fn new(app: Arc<dyn AppAuthenticator>, repos_client_factory: ReposClientFactory) -> Self {
        Self {
            app,
            keys: Arc::new(RsaKeyPairGenerator::default()),
            repos_client_factory,
            key_rotation_interval: Duration::days(DEFAULT_DEPLOY_KEY_ROTATION_DAYS),
        }
    }

    /// Interval after which an issued deploy key is reported as expired.
    pub fn with_deploy_key_rotation_interval(mut self, interval: Duration) -> Self {
        self.key_rotation_interval = interval;
        self
    }

    pub fn with_key_generator(mut self, keys: Arc<dyn KeyPairGenerator>) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_repos_client_factory(mut self, factory: ReposClientFactory) -> Self {
        self.repos_client_factory = factory;
        self
    }

    pub fn key_rotation_interval(&self) -> Duration {
        self.key_rotation_interval
    }

    fn key_expiration(&self, created_at: DateTime<Utc>) -> Result<DateTime<Utc>, ProviderError> {
        created_at
            .checked_add_signed(self.key_rotation_interval)
            .ok_or(ProviderError::RotationIntervalOutOfRange(self.key_rotation_interval))
    }

    async fn create_access_token(&self, request: &Request) -> Result<Issued, ProviderError> {
        let c: AccessTokenRequestConfig =
            request
                .decode_config()
                .map_err(|source| ProviderError::ConfigDecode {
                    op: "unmarshal request config",
                    source,
                })?;

        let token = self
            .app
            .exchange(&c.owner, &Permissions::automation())
            .await
            .map_err(|source| ProviderError::AuthExchange {
                op: "create access token",
                source,
            })?;

        info!(owner = %c.owner, expires_at = %token.expires_at, "Issued github access token");

        let credential = Credential::new(
            format!("{}-access-token", c.owner),
            token.token,
            ACCESS_TOKEN_DESCRIPTION,
            token.expires_at,
        );
        Ok((vec![credential], None))
    }

    async fn create_deploy_key(&self, request: &Request) -> Result<Issued, ProviderError> {
        let c: DeployKeyRequestConfig =
            request
                .decode_config()
                .map_err(|source| ProviderError::ConfigDecode {
                    op: "unmarshal request config",
                    source,
                })?;

        // Reject an unusable interval before a key is registered.
        self.key_expiration(Utc::now())?;

        let admin = self
            .app
            .exchange(&c.owner, &Permissions::administration())
            .await
            .map_err(|source| ProviderError::AuthExchange {
                op: "create administrator access token",
                source,
            })?;

        // RSA generation is CPU bound.
        let keys = Arc::clone(&self.keys);
        let pair = tokio::task::spawn_blocking(move || keys.generate())
            .await
            .map_err(KeyGenError::from)??;

        let key = (self.repos_client_factory)(&admin.token)
            .create_key(
                &c.owner,
                &c.repository,
                &NewDeployKey {
                    key: pair.public_key,
                    title: c.title.clone(),
                    read_only: c.read_only,
                },
            )
            .await
            .map_err(|source| ProviderError::RemoteApi {
                op: "create deploy key",
                source,
            })?;

        info!(
            owner = %c.owner,
            repository = %c.repository,
            key_id = key.id,
            read_only = key.read_only,
            "Registered github deploy key"
        );

        let mut metadata = Metadata::new();
        metadata.insert(KEY_ID, key.id.to_string());

        let credential = Credential::new(
            format!("{}-deploy-key", c.repository),
            pair.private_key_pem,
            DEPLOY_KEY_DESCRIPTION,
            self.key_expiration(key.created_at)?,
        );
        Ok((vec![credential], Some(metadata)))
    }
}

#[async_trait]
impl Provider for GithubProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Github
    }

    async fn create(&self, request: &Request) -> Result<Issued, ProviderError> {
        match &request.kind {
            RequestType::GithubAccessToken => self.create_access_token(request).await,
            RequestType::GithubDeployKey => self.create_deploy_key(request).await,
            RequestType::Unknown(kind) => Err(ProviderError::InvalidRequestKind(kind.clone())),
        }
    }

    async fn destroy(&self, resource: &Resource) -> Result<(), ProviderError> {
        let c: DeployKeyRequestConfig =
            resource
                .decode_config()
                .map_err(|source| ProviderError::ConfigDecode {
                    op: "unmarshal resource config",
                    source,
                })?;

        let raw = match resource.metadata_value(KEY_ID) {
            Some(s) if !s.is_empty() => s,
            _ => {
                debug!(
                    owner = %c.owner,
                    repository = %c.repository,
                    "No deploy key recorded, nothing to destroy"
                );
                return Ok(());
            }
        };
        let key_id: i64 = raw
            .parse()
            .map_err(|source| ProviderError::MetadataCorruption {
                key_id: raw.to_string(),
                source,
            })?;

        let admin = self
            .app
            .exchange(&c.owner, &Permissions::administration())
            .await
            .map_err(|source| ProviderError::AuthExchange {
                op: "create administrator access token",
                source,
            })?;

        match (self.repos_client_factory)(&admin.token)
            .delete_key(&c.owner, &c.repository, key_id)
            .await
        {
            Ok(()) => {
                info!(owner = %c.owner, repository = %c.repository, key_id, "Deleted github deploy key");
            }
            Err(e) if e.is_not_found() => {
                info!(
                    owner = %c.owner,
                    repository = %c.repository,
                    key_id,
                    "Github deploy key already removed"
                );
            }
            Err(source) => {
                return Err(ProviderError::RemoteApi {
                    op: "delete deploy key",
                    source,
                })
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for GithubProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubProvider")
            .field("key_rotation_interval", &self.key_rotation_interval)
            .finish_non_exhaustive()
    }
}
