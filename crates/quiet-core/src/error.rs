use thiserror::Error;

/// Errors surfaced by the quiet-block store.
///
/// `Database` carries a string so this crate stays free of a rusqlite
/// dependency; the store maps driver errors at its own boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request violates a block invariant (end before start, description
    /// bounds, start not far enough in the future). Surfaced to the caller,
    /// never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested interval overlaps another block owned by the same user.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No block with this ID exists for the caller.
    #[error("Quiet block not found: {id}")]
    NotFound { id: String },

    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors from resolving an owner ID to a contact address.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Database error: {0}")]
    Database(String),
}

/// Configuration could not be loaded or failed validation.
#[derive(Debug, Error)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);
