use thiserror::Error;

/// Errors from the users subsystem.
#[derive(Debug, Error)]
pub enum UserError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No user with the given ID exists.
    #[error("User not found: {0}")]
    NotFound(String),

    /// A user with this email already exists.
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),
}

pub type Result<T> = std::result::Result<T, UserError>;
