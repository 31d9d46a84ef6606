use rusqlite::Connection;

/// Initialise the quiet-block schema in `conn`.
///
/// Creates the `quiet_blocks` table (idempotent) plus two indexes: one for
/// the per-owner listing/overlap queries, one for the dispatcher's
/// not-yet-notified poll.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS quiet_blocks (
            id          TEXT    NOT NULL PRIMARY KEY,
            owner_id    TEXT    NOT NULL,
            starts_at   TEXT    NOT NULL,   -- RFC 3339 UTC, fixed width
            ends_at     TEXT    NOT NULL,   -- RFC 3339 UTC, fixed width
            description TEXT    NOT NULL,
            notified    INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL
        ) STRICT;

        -- Per-owner listing and overlap checks: WHERE owner_id = ? AND …
        CREATE INDEX IF NOT EXISTS idx_quiet_blocks_owner
            ON quiet_blocks (owner_id, starts_at);

        -- Dispatcher poll: WHERE notified = 0
        CREATE INDEX IF NOT EXISTS idx_quiet_blocks_notified
            ON quiet_blocks (notified, starts_at);
        ",
    )?;
    Ok(())
}
