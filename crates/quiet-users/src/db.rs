use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::{Result, UserError};
use crate::types::User;

const USER_SELECT_SQL: &str =
    "SELECT id, email, api_token, created_at, updated_at FROM users";

/// Map a SELECT row (column order from USER_SELECT_SQL) to a User.
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        api_token: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Initialise the users table. Safe to call on every startup;
/// CREATE IF NOT EXISTS means it's idempotent.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id          TEXT NOT NULL PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            api_token   TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_users_token ON users (api_token);
        ",
    )
}

/// Insert a brand-new user row. The id and API token are generated here so
/// the caller immediately has both without a follow-up query.
pub fn create_user(conn: &Connection, email: &str) -> Result<User> {
    let now = Utc::now().to_rfc3339();
    let user = User {
        id: Uuid::now_v7().to_string(),
        email: email.trim().to_lowercase(),
        // "qh_" prefix makes leaked tokens easy to grep for.
        api_token: format!("qh_{}", Uuid::new_v4().simple()),
        created_at: now.clone(),
        updated_at: now,
    };
    let inserted = conn.execute(
        "INSERT INTO users (id, email, api_token, created_at, updated_at)
         VALUES (?1,?2,?3,?4,?5)",
        params![
            user.id,
            user.email,
            user.api_token,
            user.created_at,
            user.updated_at
        ],
    );
    match inserted {
        Ok(_) => Ok(user),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(UserError::DuplicateEmail(user.email))
        }
        Err(e) => Err(e.into()),
    }
}

/// Load a user by primary key. Returns None instead of an error when absent
/// so callers decide whether missing is exceptional in their context.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let sql = format!("{USER_SELECT_SQL} WHERE id=?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![user_id], row_to_user) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Look up the user holding an API token.
pub fn find_user_by_token(conn: &Connection, token: &str) -> Result<Option<User>> {
    let sql = format!("{USER_SELECT_SQL} WHERE api_token=?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![token], row_to_user) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
