//! Notification seams shared between the dispatcher, the block store and
//! the identity lookup.
//!
//! The dispatcher only ever talks to these traits; the gateway wires in the
//! SQLite-backed implementations, tests wire in in-memory ones.

use chrono::{DateTime, Utc};

use crate::error::{IdentityError, StoreResult};
use crate::types::QuietBlock;

/// The two store operations the dispatcher needs.
///
/// `try_mark_notified` is the sole write path for the `notified` flag and the
/// only concurrency control in the system: each block's flip is an isolated
/// compare-and-set, so overlapping dispatcher runs serialise per block with
/// no broader locking.
pub trait NotificationStore: Send + Sync {
    /// All blocks with `notified == false`, in no particular order.
    fn list_not_notified(&self) -> StoreResult<Vec<QuietBlock>>;

    /// Conditionally flip `notified` false→true, bumping `updated_at` to
    /// `now`. Returns whether *this* call performed the flip; `false` means
    /// a concurrent run already handled the block.
    fn try_mark_notified(&self, id: &str, now: DateTime<Utc>) -> StoreResult<bool>;
}

/// Resolves a block owner to the email address reminders go to.
///
/// Synchronous on purpose: the shipped implementation is a local table
/// lookup with an in-process cache, not a network hop. `Ok(None)` means the
/// owner has no known address, a terminal per-block failure for that run.
pub trait IdentityProvider: Send + Sync {
    fn email_for_owner(&self, owner_id: &str) -> Result<Option<String>, IdentityError>;
}

/// A fully rendered reminder, ready for any email provider adapter.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub from_name: String,
    pub from_address: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}
