use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Read,
    Write,
}

/// Scopes requested for an installation access token.
///
/// Serializes to GitHub's `permissions` object; unset scopes are omitted so
/// the token gets nothing beyond what is listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Permissions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administration: Option<AccessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<AccessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AccessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_requests: Option<AccessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statuses: Option<AccessLevel>,
}

impl Permissions {
    /// Profile for tokens handed to CI automation.
    pub fn automation() -> Self {
        Self {
            metadata: Some(AccessLevel::Read),
            contents: Some(AccessLevel::Read),
            pull_requests: Some(AccessLevel::Write),
            statuses: Some(AccessLevel::Write),
            ..Self::default()
        }
    }

    /// Profile needed to add and remove deploy keys. Never handed out.
    pub fn administration() -> Self {
        Self {
            administration: Some(AccessLevel::Write),
            metadata: Some(AccessLevel::Read),
            ..Self::default()
        }
    }
}
