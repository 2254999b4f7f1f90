use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::credential::Metadata;

/// A previously created resource, rebuilt by the orchestrator from its state.
///
/// `config` has the same schema as the `Request::config` that created it.
/// `metadata` is absent when nothing was ever recorded for the resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl Resource {
    pub fn new(config: serde_json::Value, metadata: Option<Metadata>) -> Self {
        Self { config, metadata }
    }

    pub fn decode_config<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        super::decode_object(&self.config)
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }
}
