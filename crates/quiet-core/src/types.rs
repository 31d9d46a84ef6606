use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user-scheduled study session that gets an email reminder shortly
/// before it starts.
///
/// All instants are absolute UTC timestamps. Any offset-bearing input is
/// normalised to UTC at the deserialization boundary; human-readable local
/// formatting happens only in the email template layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuietBlock {
    /// UUID v4 string, assigned at creation. Primary key.
    pub id: String,
    /// Owning user's ID. Immutable after creation.
    pub owner_id: String,
    /// Session start. Always strictly before `ends_at`.
    pub starts_at: DateTime<Utc>,
    /// Session end.
    pub ends_at: DateTime<Utc>,
    /// Free-text label, trimmed, non-empty, at most 100 characters.
    pub description: String,
    /// Whether the reminder email was delivered. Flipped false→true exactly
    /// once by the dispatcher's conditional update; never reverts.
    pub notified: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Advances on every mutation, including the notified flip.
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/blocks`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBlockRequest {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub description: String,
}

/// Body of `PUT /api/blocks/{id}`. Same shape as create; the block ID comes
/// from the URL path.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBlockRequest {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub description: String,
}

/// Outcome of a single dispatcher run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    /// Blocks that fell inside the due or grace window this run.
    pub attempted: usize,
    /// Blocks for which an email went out and this run won the notified flip.
    pub sent: usize,
    /// Blocks a concurrent run marked notified before we could; nothing was
    /// re-sent for these.
    pub already_handled: usize,
    /// Per-block terminal failures for this run; these blocks stay
    /// un-notified and are retried on the next run.
    pub failures: Vec<DispatchFailure>,
}

/// One block that could not be notified in this run, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchFailure {
    pub block_id: String,
    pub reason: String,
}
