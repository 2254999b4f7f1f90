use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::models::{Credential, Metadata, Request, Resource};

/// Credentials issued by one `create` call, plus metadata to persist when a
/// durable remote resource was created.
pub type Issued = (Vec<Credential>, Option<Metadata>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Github,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Github => f.write_str("github"),
        }
    }
}

/// Contract between the orchestrator and a credential backend.
///
/// Implementations hold no per-request state; one instance is shared by all
/// concurrent calls. Neither method retries.
#[async_trait]
pub trait Provider: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    /// Issue the credentials described by `request`.
    async fn create(&self, request: &Request) -> Result<Issued, ProviderError>;

    /// Remove the remote counterpart of a previously created resource.
    /// Succeeds when there is nothing left to remove.
    async fn destroy(&self, resource: &Resource) -> Result<(), ProviderError>;
}
