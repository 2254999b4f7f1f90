pub mod credential;
pub mod request;
pub mod resource;

pub use credential::{Credential, Metadata, KEY_ID};
pub use request::{AccessTokenRequestConfig, DeployKeyRequestConfig, Request, RequestType};
pub use resource::Resource;

use serde::de::{DeserializeOwned, Error as _, Unexpected};
use serde_json::Value;

/// Decode a kind-specific config. Only JSON objects are accepted: a derived
/// struct would otherwise also take an array and bind its fields by position.
pub(crate) fn decode_object<T: DeserializeOwned>(config: &Value) -> Result<T, serde_json::Error> {
    let unexpected = match config {
        Value::Object(_) => return T::deserialize(config),
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
    };
    Err(serde_json::Error::invalid_type(unexpected, &"a JSON object"))
}
