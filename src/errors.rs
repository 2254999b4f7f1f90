use reqwest::StatusCode;
use thiserror::Error;

/// Failure surfaced by `Provider::create` / `Provider::destroy`.
///
/// Every message starts with the operation that failed. None of the variants
/// carry credential material: tokens and private keys never reach an error.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{op}: {source}")]
    ConfigDecode {
        op: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{op}: {source}")]
    AuthExchange {
        op: &'static str,
        #[source]
        source: AuthError,
    },

    #[error("generate key pair: {0}")]
    KeyGeneration(#[from] KeyGenError),

    #[error("{op}: {source}")]
    RemoteApi {
        op: &'static str,
        #[source]
        source: GithubApiError,
    },

    #[error("invalid request: {0}")]
    InvalidRequestKind(String),

    #[error("deploy key rotation interval {0} is out of range")]
    RotationIntervalOutOfRange(chrono::Duration),

    #[error("failed to convert key id ({key_id}) to int: {source}")]
    MetadataCorruption {
        key_id: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Token exchange with the GitHub App identity failed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("sign app jwt: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("no installation found for owner '{0}'")]
    InstallationNotFound(String),

    #[error("list installations: {0}")]
    ListInstallations(#[source] GithubApiError),

    #[error("create installation token: {0}")]
    CreateToken(#[source] GithubApiError),
}

#[derive(Debug, Error)]
pub enum KeyGenError {
    #[error("rsa: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("pkcs1 encoding: {0}")]
    Pkcs1(#[from] rsa::pkcs1::Error),

    #[error("ssh encoding: {0}")]
    Ssh(#[from] ssh_key::Error),

    #[error("key generation task: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Error returned by the GitHub REST API client.
///
/// `Status` keeps only the HTTP status and GitHub's `message` field; request
/// headers (and so the bearer token) are never captured.
#[derive(Debug, Error)]
pub enum GithubApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("github returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("invalid response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl GithubApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GithubApiError::Status { status, .. } => Some(*status),
            GithubApiError::Transport(e) => e.status(),
            GithubApiError::Decode(_) => None,
        }
    }

    /// True when GitHub reported the target as missing (HTTP 404).
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let gone = GithubApiError::Status {
            status: StatusCode::NOT_FOUND,
            message: "Not Found".into(),
        };
        assert!(gone.is_not_found());

        let forbidden = GithubApiError::Status {
            status: StatusCode::FORBIDDEN,
            message: "Resource not accessible by integration".into(),
        };
        assert!(!forbidden.is_not_found());
        assert_eq!(forbidden.status(), Some(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_messages_lead_with_operation() {
        let err = ProviderError::AuthExchange {
            op: "create access token",
            source: AuthError::InstallationNotFound("acme".into()),
        };
        assert_eq!(
            err.to_string(),
            "create access token: no installation found for owner 'acme'"
        );

        let err = ProviderError::InvalidRequestKind("aws:sts".into());
        assert_eq!(err.to_string(), "invalid request: aws:sts");
    }

    #[test]
    fn test_metadata_corruption_names_the_key() {
        let source = "not-a-number".parse::<i64>().unwrap_err();
        let err = ProviderError::MetadataCorruption {
            key_id: "not-a-number".into(),
            source,
        };
        assert!(err.to_string().starts_with("failed to convert key id (not-a-number) to int"));
    }
}
