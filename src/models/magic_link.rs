use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Login claim carried, encrypted, inside a magic link.
///
/// Never persisted: it only exists inside the opaque `magic` query parameter
/// and, while a callback request is handled, in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagicLinkPayload {
    pub email: String,
    /// Matched against the nonce stored in the requesting browser's session.
    pub nonce: String,
    pub created_at: DateTime<Utc>,
}

impl MagicLinkPayload {
    pub fn new(email: impl Into<String>, nonce: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            nonce: nonce.into(),
            created_at,
        }
    }
}
