use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::{debug, info};

use quiet_core::error::IdentityError;
use quiet_core::notify::IdentityProvider;

use crate::db::{create_user, find_user_by_token, get_user, init_db};
use crate::error::Result;
use crate::types::User;

/// Maximum number of owner_id → email pairs kept in the in-process cache.
/// Simple eviction: when full, drop the oldest half.
const CACHE_MAX: usize = 256;

/// User lookups backed by SQLite with a small in-memory cache.
///
/// Hot paths: every authenticated request resolves a bearer token, and every
/// dispatcher run resolves owner emails. The email cache avoids a DB
/// round-trip per due block for known owners.
pub struct UserDirectory {
    db: Arc<Mutex<Connection>>,
    /// Key: owner_id, Value: email.
    /// Stored in insertion order via Vec-backed eviction (simple; good enough
    /// for the expected account counts).
    email_cache: Mutex<HashMap<String, String>>,
    /// Insertion-order key list for eviction, parallel to the HashMap.
    cache_order: Mutex<Vec<String>>,
}

impl UserDirectory {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            email_cache: Mutex::new(HashMap::new()),
            cache_order: Mutex::new(Vec::new()),
        })
    }

    /// Register a new account. Returns the full record including the
    /// freshly generated API token.
    pub fn register(&self, email: &str) -> Result<User> {
        let conn = self.db.lock().unwrap();
        let user = create_user(&conn, email)?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Resolve a bearer token to a user, or None for an unknown token.
    pub fn authenticate(&self, token: &str) -> Result<Option<User>> {
        let conn = self.db.lock().unwrap();
        find_user_by_token(&conn, token)
    }

    /// Look up a user by primary key.
    pub fn get(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.db.lock().unwrap();
        get_user(&conn, user_id)
    }

    /// Drop the cached email for `user_id`. Call after account mutations.
    pub fn invalidate(&self, user_id: &str) {
        let mut cache = self.email_cache.lock().unwrap();
        let mut order = self.cache_order.lock().unwrap();
        cache.remove(user_id);
        order.retain(|k| k != user_id);
    }

    // ── cache helpers ─────────────────────────────────────────────────────

    fn cache_lookup(&self, owner_id: &str) -> Option<String> {
        self.email_cache.lock().unwrap().get(owner_id).cloned()
    }

    fn cache_insert(&self, owner_id: String, email: String) {
        let mut cache = self.email_cache.lock().unwrap();
        let mut order = self.cache_order.lock().unwrap();

        if cache.contains_key(&owner_id) {
            cache.insert(owner_id, email);
            return;
        }

        // Evict oldest half when at capacity to prevent unbounded growth.
        if cache.len() >= CACHE_MAX {
            let evict_count = CACHE_MAX / 2;
            let to_remove: Vec<_> = order.drain(..evict_count).collect();
            for k in to_remove {
                cache.remove(&k);
            }
        }

        order.push(owner_id.clone());
        cache.insert(owner_id, email);
    }
}

impl IdentityProvider for UserDirectory {
    /// Owner → email with a fast cache path; DB on miss.
    fn email_for_owner(&self, owner_id: &str) -> std::result::Result<Option<String>, IdentityError> {
        if let Some(email) = self.cache_lookup(owner_id) {
            debug!(owner_id, "email cache hit");
            return Ok(Some(email));
        }

        let conn = self.db.lock().unwrap();
        let user = get_user(&conn, owner_id).map_err(|e| IdentityError::Database(e.to_string()))?;
        drop(conn);

        match user {
            Some(u) => {
                self.cache_insert(owner_id.to_string(), u.email.clone());
                Ok(Some(u.email))
            }
            None => Ok(None),
        }
    }
}
