use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info};
use uuid::Uuid;

use quiet_core::error::{StoreError, StoreResult};
use quiet_core::notify::NotificationStore;
use quiet_core::types::{CreateBlockRequest, QuietBlock, UpdateBlockRequest};

use crate::db::init_db;

/// Seconds a new start must lie in the future, covering request processing
/// time so a block can't start before its creation response lands.
pub const MIN_START_BUFFER_SECS: i64 = 30;

/// Upper bound on description length, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 100;

const BLOCK_SELECT_SQL: &str = "SELECT id, owner_id, starts_at, ends_at, description,
        notified, created_at, updated_at
 FROM quiet_blocks";

/// Shared handle over the quiet-block table.
///
/// Uses its own `Connection` behind a mutex so HTTP handlers and the
/// notifier engine can operate without conflicting prepared statements.
pub struct BlockStore {
    conn: Arc<Mutex<Connection>>,
}

impl BlockStore {
    /// Wrap `conn`, initialising the schema if needed.
    pub fn new(conn: Connection) -> StoreResult<Self> {
        init_db(&conn).map_err(db_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Validate and insert a new block for `owner_id`.
    pub fn create_block(
        &self,
        owner_id: &str,
        req: &CreateBlockRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<QuietBlock> {
        let description = validate_fields(req.starts_at, req.ends_at, &req.description)?;

        // Processing buffer: the block must start comfortably after "now".
        let min_start = now + Duration::seconds(MIN_START_BUFFER_SECS);
        if req.starts_at <= min_start {
            return Err(StoreError::Validation(
                "start time must be in the future".to_string(),
            ));
        }

        let conn = self.conn.lock().unwrap();
        check_overlap(&conn, owner_id, None, req.starts_at, req.ends_at)?;

        let block = QuietBlock {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            starts_at: req.starts_at,
            ends_at: req.ends_at,
            description,
            notified: false,
            created_at: now,
            updated_at: now,
        };
        conn.execute(
            "INSERT INTO quiet_blocks
             (id, owner_id, starts_at, ends_at, description, notified,
              created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,0,?6,?6)",
            params![
                block.id,
                block.owner_id,
                ts(block.starts_at),
                ts(block.ends_at),
                block.description,
                ts(now),
            ],
        )
        .map_err(db_err)?;

        info!(block_id = %block.id, owner_id, "quiet block created");
        Ok(block)
    }

    /// Validate and apply an update to an existing block owned by `owner_id`.
    ///
    /// The minimum-future rule only applies when the start actually changes,
    /// so editing the description of an imminent block stays legal. The
    /// overlap check exempts the block's own interval.
    pub fn update_block(
        &self,
        owner_id: &str,
        id: &str,
        req: &UpdateBlockRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<QuietBlock> {
        let description = validate_fields(req.starts_at, req.ends_at, &req.description)?;

        let conn = self.conn.lock().unwrap();
        let existing = get_owned(&conn, owner_id, id)?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        if req.starts_at != existing.starts_at {
            let min_start = now + Duration::seconds(MIN_START_BUFFER_SECS);
            if req.starts_at <= min_start {
                return Err(StoreError::Validation(
                    "start time must be in the future when changed".to_string(),
                ));
            }
        }

        check_overlap(&conn, owner_id, Some(id), req.starts_at, req.ends_at)?;

        conn.execute(
            "UPDATE quiet_blocks
             SET starts_at=?3, ends_at=?4, description=?5, updated_at=?6
             WHERE id=?1 AND owner_id=?2",
            params![
                id,
                owner_id,
                ts(req.starts_at),
                ts(req.ends_at),
                description,
                ts(now),
            ],
        )
        .map_err(db_err)?;

        debug!(block_id = %id, owner_id, "quiet block updated");
        Ok(QuietBlock {
            starts_at: req.starts_at,
            ends_at: req.ends_at,
            description,
            updated_at: now,
            ..existing
        })
    }

    /// Delete a block owned by `owner_id`. `NotFound` if no row matches.
    pub fn delete_block(&self, owner_id: &str, id: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn
            .execute(
                "DELETE FROM quiet_blocks WHERE id=?1 AND owner_id=?2",
                params![id, owner_id],
            )
            .map_err(db_err)?;
        if n == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        info!(block_id = %id, owner_id, "quiet block deleted");
        Ok(())
    }

    /// Fetch one block scoped to its owner.
    pub fn get_block(&self, owner_id: &str, id: &str) -> StoreResult<Option<QuietBlock>> {
        let conn = self.conn.lock().unwrap();
        get_owned(&conn, owner_id, id)
    }

    /// Cheap liveness probe for the health endpoint.
    pub fn ping(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(())).map_err(db_err)
    }

    /// All of `owner_id`'s blocks, ascending by start.
    pub fn list_blocks(&self, owner_id: &str) -> StoreResult<Vec<QuietBlock>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("{BLOCK_SELECT_SQL} WHERE owner_id=?1 ORDER BY starts_at");
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let blocks = stmt
            .query_map(params![owner_id], row_to_block)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(blocks)
    }
}

impl NotificationStore for BlockStore {
    fn list_not_notified(&self) -> StoreResult<Vec<QuietBlock>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("{BLOCK_SELECT_SQL} WHERE notified=0");
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let blocks = stmt
            .query_map([], row_to_block)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(blocks)
    }

    fn try_mark_notified(&self, id: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        // Compare-and-set: only the run that still sees notified=0 wins.
        let n = conn
            .execute(
                "UPDATE quiet_blocks SET notified=1, updated_at=?2
                 WHERE id=?1 AND notified=0",
                params![id, ts(now)],
            )
            .map_err(db_err)?;
        Ok(n == 1)
    }
}

// --- helpers ---------------------------------------------------------------

/// Serialise an instant for storage. Fixed-width (microseconds, `Z` suffix)
/// so lexicographic comparison inside SQL matches chronological order.
fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Check interval and description invariants shared by create and update.
/// Returns the trimmed description.
fn validate_fields(
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    description: &str,
) -> StoreResult<String> {
    if ends_at <= starts_at {
        return Err(StoreError::Validation(
            "end time must be after start time".to_string(),
        ));
    }
    let description = description.trim();
    if description.is_empty() {
        return Err(StoreError::Validation(
            "description must not be empty".to_string(),
        ));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(StoreError::Validation(format!(
            "description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(description.to_string())
}

/// Per-owner interval exclusivity on `[starts_at, ends_at)`.
/// `exempt_id` excludes the block's own row during updates.
fn check_overlap(
    conn: &Connection,
    owner_id: &str,
    exempt_id: Option<&str>,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> StoreResult<()> {
    let exempt = exempt_id.unwrap_or("");
    let mut stmt = conn
        .prepare_cached(
            "SELECT id FROM quiet_blocks
             WHERE owner_id=?1 AND id<>?2 AND starts_at<?3 AND ends_at>?4
             LIMIT 1",
        )
        .map_err(db_err)?;
    let hit: Option<String> = stmt
        .query_row(params![owner_id, exempt, ts(ends_at), ts(starts_at)], |r| {
            r.get(0)
        })
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(db_err(other)),
        })?;
    match hit {
        Some(other) => Err(StoreError::Conflict(format!(
            "time slot overlaps existing quiet block {other}"
        ))),
        None => Ok(()),
    }
}

fn get_owned(conn: &Connection, owner_id: &str, id: &str) -> StoreResult<Option<QuietBlock>> {
    let sql = format!("{BLOCK_SELECT_SQL} WHERE id=?1 AND owner_id=?2");
    let mut stmt = conn.prepare(&sql).map_err(db_err)?;
    match stmt.query_row(params![id, owner_id], row_to_block) {
        Ok(b) => Ok(Some(b)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(db_err(e)),
    }
}

/// Map a SELECT row (column order from BLOCK_SELECT_SQL) to a QuietBlock.
fn row_to_block(row: &rusqlite::Row<'_>) -> rusqlite::Result<QuietBlock> {
    Ok(QuietBlock {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        starts_at: parse_ts(2, row.get(2)?)?,
        ends_at: parse_ts(3, row.get(3)?)?,
        description: row.get(4)?,
        notified: row.get::<_, i64>(5)? != 0,
        created_at: parse_ts(6, row.get(6)?)?,
        updated_at: parse_ts(7, row.get(7)?)?,
    })
}

fn parse_ts(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
