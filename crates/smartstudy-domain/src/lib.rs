//! Smart Study Domain Layer
//!
//! This crate contains the data model shared by every other Smart Study crate.
//! It defines what a study session is, what the generated study materials look
//! like, and the trait boundary to the persistence layer. It depends only on
//! `serde`, because session records are JSON snapshots.
//!
//! ## Key Concepts
//!
//! - **DocumentMeta**: Identity of an uploaded document (content hash, name, size)
//! - **QuizItem / Flashcard**: Canonical shapes of generated study material
//! - **StudySession**: The snapshot record persisted per document
//! - **Stage / StepState**: Per-stage generation status (idle → pending → done | error)
//!
//! ## Architecture
//!
//! - Pure data and invariants only
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod material;
pub mod session;
pub mod step;
pub mod traits;

// Re-exports for convenience
pub use document::DocumentMeta;
pub use material::{Flashcard, QuizItem};
pub use session::StudySession;
pub use step::{Stage, StepState};
pub use traits::{PersistError, SessionPersistence, SessionStore};
