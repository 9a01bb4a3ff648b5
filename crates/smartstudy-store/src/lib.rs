//! Smart Study Storage Layer
//!
//! Implements the SessionStore trait on SQLite.
//!
//! # Architecture
//!
//! - `sessions` table: one JSON snapshot per document, keyed by content hash
//! - `kv` table: small settings such as the last opened session
//! - [`DebouncedPersister`]: coalesces bursts of updates into one write
//!
//! # Examples
//!
//! ```no_run
//! use smartstudy_store::SqliteSessionStore;
//!
//! let store = SqliteSessionStore::new(":memory:").unwrap();
//! // Store is now ready for session operations
//! ```

#![warn(missing_docs)]

mod persister;

pub use persister::DebouncedPersister;

use rusqlite::{params, Connection, OptionalExtension};
use smartstudy_domain::{SessionStore, StudySession};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, warn};

const LAST_SESSION_KEY: &str = "lastSessionId";

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Snapshot could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session has no id to save under
    #[error("Session must include an id before saving.")]
    MissingId,
}

/// SQLite-based implementation of SessionStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share a store between tasks by
/// wrapping it in a mutex, as [`DebouncedPersister`] does.
pub struct SqliteSessionStore {
    conn: Connection,
}

impl SqliteSessionStore {
    /// Open (or create) a store at the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use smartstudy_store::SqliteSessionStore;
    ///
    /// let store = SqliteSessionStore::new("smart-study.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    /// Read a value from the key-value table
    pub fn get_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Write a value to the key-value table; `None` removes the key
    pub fn set_value(&mut self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        match value {
            Some(value) => {
                self.conn.execute(
                    "INSERT INTO kv (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![key, value],
                )?;
            }
            None => {
                self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
            }
        }
        Ok(())
    }

    /// Decode a stored snapshot, tolerating damaged fields
    fn decode(payload: &str) -> Result<StudySession, StoreError> {
        let value: serde_json::Value = serde_json::from_str(payload)?;
        let mut session = StudySession::new();
        session.hydrate(Some(&value));
        Ok(session)
    }
}

impl SessionStore for SqliteSessionStore {
    type Error = StoreError;

    fn save_session(&mut self, session: &StudySession) -> Result<String, Self::Error> {
        let id = session
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(StoreError::MissingId)?
            .to_string();
        let payload = serde_json::to_string(session)?;

        self.conn.execute(
            "INSERT INTO sessions (id, payload, updated_at, saved_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
             payload = excluded.payload, updated_at = excluded.updated_at, saved_at = excluded.saved_at",
            params![
                &id,
                &payload,
                session.updated_at.unwrap_or(0) as i64,
                now_millis() as i64,
            ],
        )?;
        self.set_last_session_id(Some(&id))?;

        debug!("Saved session {}", id);
        Ok(id)
    }

    fn load_session(&self, id: &str) -> Result<Option<StudySession>, Self::Error> {
        if id.is_empty() {
            return Ok(None);
        }
        let payload: Option<String> = self
            .conn
            .query_row("SELECT payload FROM sessions WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;

        payload.as_deref().map(Self::decode).transpose()
    }

    fn delete_session(&mut self, id: &str) -> Result<(), Self::Error> {
        if id.is_empty() {
            return Ok(());
        }
        self.conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        if self.last_session_id()?.as_deref() == Some(id) {
            self.set_last_session_id(None)?;
        }
        Ok(())
    }

    fn list_sessions(&self) -> Result<Vec<StudySession>, Self::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, payload FROM sessions ORDER BY updated_at DESC, id ASC")?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut sessions = Vec::with_capacity(rows.len());
        for (id, payload) in rows {
            match Self::decode(&payload) {
                Ok(session) => sessions.push(session),
                Err(e) => warn!("Skipping unreadable session {}: {}", id, e),
            }
        }
        Ok(sessions)
    }

    fn set_last_session_id(&mut self, id: Option<&str>) -> Result<(), Self::Error> {
        self.set_value(LAST_SESSION_KEY, id.filter(|id| !id.is_empty()))
    }

    fn last_session_id(&self) -> Result<Option<String>, Self::Error> {
        self.get_value(LAST_SESSION_KEY)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
