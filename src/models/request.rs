use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Kind of credential a request asks for.
///
/// Unrecognized kinds still deserialize (into `Unknown`) so that the provider
/// can reject them itself instead of failing the whole batch at load time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestType {
    GithubAccessToken,
    GithubDeployKey,
    Unknown(String),
}

impl RequestType {
    pub fn as_str(&self) -> &str {
        match self {
            RequestType::GithubAccessToken => "github:access-token",
            RequestType::GithubDeployKey => "github:deploy-key",
            RequestType::Unknown(other) => other,
        }
    }
}

impl From<String> for RequestType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "github:access-token" => RequestType::GithubAccessToken,
            "github:deploy-key" => RequestType::GithubDeployKey,
            _ => RequestType::Unknown(s),
        }
    }
}

impl From<RequestType> for String {
    fn from(t: RequestType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declarative credential request, as handed over by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "type")]
    pub kind: RequestType,
    /// Kind-specific configuration, decoded on demand.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl Request {
    pub fn new(kind: RequestType, config: serde_json::Value) -> Self {
        Self { kind, config }
    }

    pub fn decode_config<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        super::decode_object(&self.config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenRequestConfig {
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployKeyRequestConfig {
    pub owner: String,
    pub repository: String,
    pub title: String,
    #[serde(default)]
    pub read_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_type_wire_names() {
        let req: Request = serde_json::from_value(json!({
            "type": "github:deploy-key",
            "config": {"owner": "acme", "repository": "infra", "title": "ci"}
        }))
        .unwrap();
        assert_eq!(req.kind, RequestType::GithubDeployKey);

        let encoded = serde_json::to_value(&req).unwrap();
        assert_eq!(encoded["type"], "github:deploy-key");
    }

    #[test]
    fn test_unknown_request_type_is_preserved() {
        let req: Request = serde_json::from_value(json!({"type": "aws:sts"})).unwrap();
        assert_eq!(req.kind, RequestType::Unknown("aws:sts".into()));
        assert_eq!(req.kind.to_string(), "aws:sts");
        assert!(req.config.is_null());
    }

    #[test]
    fn test_deploy_key_config_defaults_read_only() {
        let req = Request::new(
            RequestType::GithubDeployKey,
            json!({"owner": "acme", "repository": "infra", "title": "ci"}),
        );
        let c: DeployKeyRequestConfig = req.decode_config().unwrap();
        assert!(!c.read_only);
        assert_eq!(c.repository, "infra");
    }

    #[test]
    fn test_access_token_config_requires_owner() {
        let req = Request::new(RequestType::GithubAccessToken, json!({"org": "acme"}));
        let err = req.decode_config::<AccessTokenRequestConfig>().unwrap_err();
        assert!(err.to_string().contains("owner"));

        let req = Request::new(RequestType::GithubAccessToken, json!({"owner": 7}));
        assert!(req.decode_config::<AccessTokenRequestConfig>().is_err());
    }

    #[test]
    fn test_config_must_be_an_object() {
        let req = Request::new(
            RequestType::GithubDeployKey,
            json!(["acme", "infra", "ci"]),
        );
        let err = req.decode_config::<DeployKeyRequestConfig>().unwrap_err();
        assert!(err.to_string().contains("expected a JSON object"), "{err}");

        for config in [json!(null), json!("acme"), json!(1), json!(true)] {
            let req = Request::new(RequestType::GithubAccessToken, config);
            assert!(req.decode_config::<AccessTokenRequestConfig>().is_err());
        }
    }
}
