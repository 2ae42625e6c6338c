//! One explicit state object per editing session.
//!
//! # Responsibility
//! - Own the notes service, the navigation state and the invalidation
//!   consumer of a single session.
//! - Revalidate navigation once a newer store revision was observed.
//! - Save and load navigation state as JSON files.
//!
//! # Invariants
//! - Out-of-order or repeated invalidations never trigger a revalidation.
//! - A failed load leaves the current navigation state untouched.

use crate::model::children::resolve_child_iteration;
use crate::model::note::NoteId;
use crate::model::path::PathError;
use crate::repo::NoteRepository;
use crate::service::navigation::{NavigationSnapshot, NavigationState};
use crate::service::notes_service::{NotesService, NotesServiceError};
use crate::sync::invalidation::{InvalidationTracker, StoreInvalidated};
use log::{debug, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path as FsPath;
use std::sync::mpsc::Receiver;

#[derive(Debug)]
pub enum SessionError {
    Notes(NotesServiceError),
    /// Persisted navigation named a malformed path.
    Path(PathError),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Notes(err) => write!(f, "{err}"),
            Self::Path(err) => write!(f, "invalid persisted navigation: {err}"),
            Self::Io(err) => write!(f, "session file error: {err}"),
            Self::Json(err) => write!(f, "session file is not valid JSON: {err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Notes(err) => Some(err),
            Self::Path(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<NotesServiceError> for SessionError {
    fn from(value: NotesServiceError) -> Self {
        Self::Notes(value)
    }
}

impl From<PathError> for SessionError {
    fn from(value: PathError) -> Self {
        Self::Path(value)
    }
}

impl From<std::io::Error> for SessionError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Notes, navigation and invalidation handling of one session.
pub struct Session<R: NoteRepository> {
    notes: NotesService<R>,
    navigation: NavigationState,
    tracker: InvalidationTracker,
    invalidations: Receiver<StoreInvalidated>,
}

impl<R: NoteRepository> Session<R> {
    pub fn new(repo: R) -> Self {
        let mut notes = NotesService::new(repo);
        let invalidations = notes.subscribe();
        Self {
            notes,
            navigation: NavigationState::new(),
            tracker: InvalidationTracker::new(),
            invalidations,
        }
    }

    pub fn notes(&self) -> &NotesService<R> {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut NotesService<R> {
        &mut self.notes
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut NavigationState {
        &mut self.navigation
    }

    pub fn tracker(&self) -> &InvalidationTracker {
        &self.tracker
    }

    /// Drains queued invalidations and revalidates navigation if any of them
    /// carried a newer store revision.
    ///
    /// Returns `true` when navigation was revalidated.
    pub fn pump_invalidations(&mut self) -> SessionResult<bool> {
        let mut advanced = false;
        for event in self.invalidations.try_iter() {
            advanced |= self.tracker.observe(event);
        }
        if !advanced {
            return Ok(false);
        }

        self.revalidate_navigation()?;
        Ok(true)
    }

    /// Feeds one externally received invalidation through the tracker.
    ///
    /// Returns `true` when navigation was revalidated.
    pub fn handle_invalidation(&mut self, event: StoreInvalidated) -> SessionResult<bool> {
        if !self.tracker.observe(event) {
            debug!(
                "event=invalidation_ignored module=session status=ok store_id={}",
                event.store_id
            );
            return Ok(false);
        }
        self.revalidate_navigation()?;
        Ok(true)
    }

    /// Writes the navigation snapshot to `path` as JSON.
    pub fn save_navigation(&self, path: impl AsRef<FsPath>) -> SessionResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.navigation.snapshot())?;
        std::fs::write(path, json)?;
        info!(
            "event=navigation_save module=session status=ok path={}",
            path.display()
        );
        Ok(())
    }

    /// Replaces navigation with the snapshot stored at `path`, then repairs it
    /// against the current graph.
    pub fn load_navigation(&mut self, path: impl AsRef<FsPath>) -> SessionResult<()> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let snapshot: NavigationSnapshot = serde_json::from_str(&json)?;
        self.navigation.restore(snapshot)?;
        self.revalidate_navigation()?;
        info!(
            "event=navigation_load module=session status=ok path={}",
            path.display()
        );
        Ok(())
    }

    fn revalidate_navigation(&mut self) -> SessionResult<()> {
        let Some(anchor_id) = self.navigation.anchor_id().cloned() else {
            return Ok(());
        };

        // Read only the child lists the referenced paths walk through, up
        // front, so store failures surface as errors instead of looking like
        // deleted notes.
        let mut lists: HashMap<NoteId, Option<Vec<NoteId>>> = HashMap::new();
        for path in self.navigation.referenced_paths() {
            let mut current = anchor_id.clone();
            for segment in path.segments() {
                if !lists.contains_key(&current) {
                    let children = self.notes.children_of(&current)?;
                    lists.insert(current.clone(), children);
                }
                let resolves = match lists.get(&current) {
                    Some(Some(children)) => {
                        resolve_child_iteration(children, &segment.id, segment.iteration).is_some()
                    }
                    _ => false,
                };
                if !resolves {
                    break;
                }
                current = segment.id.clone();
            }
        }

        let children_of = |id: &NoteId| lists.get(id).cloned().flatten();
        self.navigation.revalidate(children_of);
        debug!(
            "event=navigation_revalidate module=session status=ok notes_read={}",
            lists.len()
        );
        Ok(())
    }
}
