//! `quiet-users`: user accounts and owner-to-email resolution.
//!
//! Authentication itself is delegated to whoever provisioned the API token;
//! this crate only maps bearer tokens to user rows and owner IDs to the
//! address reminder emails go to. The [`resolver::UserDirectory`] keeps a
//! bounded in-process cache in front of the SQLite lookups.

pub mod db;
pub mod error;
pub mod resolver;
pub mod types;

pub use error::{Result, UserError};
pub use resolver::UserDirectory;
pub use types::User;
