use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Metadata key holding the GitHub-assigned id of a registered deploy key.
pub const KEY_ID: &str = "key_id";

/// A time-bounded secret issued by a provider.
///
/// `value` is wrapped in a `SecretString`: it is redacted from `Debug` output
/// and zeroized on drop. `expiration` is advisory, the orchestrator uses it to
/// schedule rotation.
#[derive(Debug)]
pub struct Credential {
    pub name: String,
    pub value: SecretString,
    pub description: String,
    pub expiration: DateTime<Utc>,
}

impl Credential {
    pub fn new(
        name: impl Into<String>,
        value: SecretString,
        description: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            description: description.into(),
            expiration,
        }
    }

    /// Borrow the plaintext, e.g. to hand it to a secret store.
    pub fn expose_value(&self) -> &str {
        self.value.expose_secret()
    }
}

/// Opaque string map persisted by the orchestrator and handed back on destroy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
