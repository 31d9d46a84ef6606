use serde::{Deserialize, Serialize};

/// A registered account that can own quiet blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID v7 string. Primary key.
    pub id: String,
    /// Address reminder emails are sent to. Unique.
    pub email: String,
    /// Opaque bearer token for the HTTP API. Unique. Never serialised into
    /// API responses; only printed once at provisioning time.
    #[serde(skip_serializing)]
    pub api_token: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// ISO-8601 timestamp of the last mutation.
    pub updated_at: String,
}
