//! sidecred GitHub provider. Issues GitHub installation access tokens and
//! rotating deploy keys from a GitHub App identity, and tears deploy keys down
//! again on reconciliation.

pub mod config;
pub mod errors;
pub mod github;
pub mod models;
pub mod provider;

pub use errors::{AuthError, GithubApiError, KeyGenError, ProviderError};
pub use github::GithubProvider;
pub use models::{Credential, Metadata, Request, RequestType, Resource};
pub use provider::{Issued, Provider, ProviderType};
