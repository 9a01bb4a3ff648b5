//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::StudySession;

/// Trait for storing and retrieving study sessions
///
/// Implemented by the infrastructure layer (smartstudy-store)
pub trait SessionStore {
    /// Error type for store operations
    type Error;

    /// Save a session and mark it as the last opened one
    ///
    /// Sessions without an id cannot be saved. Returns the saved id.
    fn save_session(&mut self, session: &StudySession) -> Result<String, Self::Error>;

    /// Load a session by id
    fn load_session(&self, id: &str) -> Result<Option<StudySession>, Self::Error>;

    /// Delete a session; clears the last-opened pointer if it referenced it
    fn delete_session(&mut self, id: &str) -> Result<(), Self::Error>;

    /// List all sessions, most recently updated first
    fn list_sessions(&self) -> Result<Vec<StudySession>, Self::Error>;

    /// Set or clear the last-opened session pointer
    fn set_last_session_id(&mut self, id: Option<&str>) -> Result<(), Self::Error>;

    /// Get the last-opened session pointer
    fn last_session_id(&self) -> Result<Option<String>, Self::Error>;
}

/// Error returned by [`SessionPersistence`] writes
pub type PersistError = Box<dyn std::error::Error + Send + Sync>;

/// Save policy used while generating study material
///
/// Implemented by the infrastructure layer (smartstudy-store) on top of a
/// [`SessionStore`].
pub trait SessionPersistence: Send + Sync {
    /// Write the session now, superseding any pending scheduled write
    fn persist_now(&self, session: &StudySession) -> Result<(), PersistError>;

    /// Write the session once updates stop arriving
    ///
    /// Each call replaces the pending snapshot and restarts the quiet period.
    fn schedule_persist(&self, session: &StudySession);
}
