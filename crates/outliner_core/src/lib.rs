//! Core of an outliner over a shared note graph.
//!
//! Notes form a directed graph in which a note may appear under several
//! parents, or several times under one parent. Every occurrence is addressed
//! by a `Path` of `id:iteration` segments, and all navigation state of a
//! session is kept in terms of such paths.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sync;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::note::{Note, NoteId};
pub use model::path::{Path, PathError, PathPart, Segment};
pub use repo::memory_repo::MemoryNoteRepository;
pub use repo::sqlite_repo::SqliteNoteRepository;
pub use repo::{MutationOutcome, NoteRepository, RepoError, RepoResult};
pub use service::navigation::{
    HistoryEntry, Mode, NavigationChange, NavigationSnapshot, NavigationState, Pin,
};
pub use service::notes_service::{NotesResult, NotesService, NotesServiceError};
pub use service::session::{Session, SessionError, SessionResult};
pub use sync::invalidation::{InvalidationEmitter, InvalidationTracker, StoreInvalidated};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
