pub mod app;
pub mod client;
pub mod keys;
pub mod permissions;
pub mod provider;

pub use app::{AppAuthenticator, GithubApp, InstallationToken};
pub use client::{DeployKey, GithubClient, NewDeployKey, ReposClientFactory, RepositoriesApi};
pub use keys::{KeyPair, KeyPairGenerator, RsaKeyPairGenerator};
pub use permissions::{AccessLevel, Permissions};
pub use provider::GithubProvider;
