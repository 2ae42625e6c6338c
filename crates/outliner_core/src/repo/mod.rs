//! Note graph store contracts and implementations.
//!
//! # Responsibility
//! - Define the store interface the core issues mutations against.
//! - Provide an in-memory store and a SQLite-backed durable store.
//!
//! # Invariants
//! - Missing notes and missing occurrences are reported as
//!   `MutationOutcome::Stale`, never as errors.
//! - The store revision advances exactly once per applied mutation.
//! - Child lists only name existing notes; parent sets are recomputed after
//!   every structural change.

use crate::db::DbError;
use crate::model::note::{Note, NoteId};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory_repo;
pub mod sqlite_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Store-level failure. From the core's point of view the mutation was
/// abandoned and no local state changed.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "note repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "note repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid note data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// What a mutation did to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The graph changed and the store revision advanced.
    Applied,
    /// Valid request that did not change anything.
    Unchanged,
    /// A referenced note or occurrence does not exist (any more).
    Stale,
}

impl MutationOutcome {
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }

    pub fn is_stale(self) -> bool {
        self == Self::Stale
    }
}

/// Note graph store.
///
/// Positions are signed: non-negative values count from the front and are
/// clamped to the list length, negative values count from the end (`-1`
/// appends).
pub trait NoteRepository {
    /// Creates a note with a fresh id and no children.
    fn create_note(&mut self, text: &str) -> RepoResult<Note>;
    /// Loads one note with its derived parent set.
    fn get_note(&self, id: &NoteId) -> RepoResult<Option<Note>>;
    /// Child list of one note, or `None` when the note does not exist.
    fn get_children(&self, id: &NoteId) -> RepoResult<Option<Vec<NoteId>>> {
        Ok(self.get_note(id)?.map(|note| note.children))
    }
    /// Replaces the note text.
    fn set_text(&mut self, id: &NoteId, text: &str) -> RepoResult<MutationOutcome>;
    /// Replaces the whole child list. Unknown ids are dropped.
    fn set_children(&mut self, id: &NoteId, children: &[NoteId]) -> RepoResult<MutationOutcome>;
    /// Inserts `child_id` at `position` in the child list of `id`.
    fn add_child(
        &mut self,
        id: &NoteId,
        child_id: &NoteId,
        position: isize,
    ) -> RepoResult<MutationOutcome>;
    /// Removes the `iteration`-th occurrence of `child_id` under `id`.
    fn remove_child(
        &mut self,
        id: &NoteId,
        child_id: &NoteId,
        iteration: usize,
    ) -> RepoResult<MutationOutcome>;
    /// Moves one occurrence of `child_id` from `from_id` to `to_position`
    /// under `to_id`. For same-parent moves `to_position` is expressed in
    /// coordinates from before the removal.
    fn move_child(
        &mut self,
        child_id: &NoteId,
        from_id: &NoteId,
        from_iteration: usize,
        to_id: &NoteId,
        to_position: isize,
    ) -> RepoResult<MutationOutcome>;
    /// Deletes a note and strips every occurrence of it from all child lists.
    fn delete_note(&mut self, id: &NoteId) -> RepoResult<MutationOutcome>;
    /// Removes every note.
    fn clear_all(&mut self) -> RepoResult<()>;
    /// Current store revision.
    fn store_id(&self) -> RepoResult<u64>;
    /// Number of notes currently stored.
    fn note_count(&self) -> RepoResult<usize>;
}
