//! Occurrence-addressed note graph use-cases.
//!
//! # Responsibility
//! - Accept `Segment`-addressed mutations and forward them to the store.
//! - Publish a `StoreInvalidated` event after every mutation that advanced
//!   the store revision.
//!
//! # Invariants
//! - Stale references are tolerated: they return `MutationOutcome::Stale`
//!   and never raise an error.
//! - Store failures are surfaced unchanged; there is no retry.

use crate::model::note::{Note, NoteId};
use crate::model::path::Segment;
use crate::repo::{MutationOutcome, NoteRepository, RepoError};
use crate::sync::invalidation::{InvalidationEmitter, StoreInvalidated};
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::Receiver;

/// Errors from notes service operations.
#[derive(Debug)]
pub enum NotesServiceError {
    /// Store-level failure; the mutation was abandoned.
    Repo(RepoError),
}

impl Display for NotesServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NotesServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for NotesServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type NotesResult<T> = Result<T, NotesServiceError>;

/// Notes service facade over a store implementation.
pub struct NotesService<R: NoteRepository> {
    repo: R,
    emitter: InvalidationEmitter,
}

impl<R: NoteRepository> NotesService<R> {
    /// Creates service from store implementation.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            emitter: InvalidationEmitter::new(),
        }
    }

    /// Subscribes to store invalidation events.
    pub fn subscribe(&mut self) -> Receiver<StoreInvalidated> {
        self.emitter.subscribe()
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn store_id(&self) -> NotesResult<u64> {
        Ok(self.repo.store_id()?)
    }

    pub fn get_note(&self, id: &NoteId) -> NotesResult<Option<Note>> {
        Ok(self.repo.get_note(id)?)
    }

    /// Children of `id`, or `None` when the note does not exist.
    pub fn children_of(&self, id: &NoteId) -> NotesResult<Option<Vec<NoteId>>> {
        Ok(self.repo.get_children(id)?)
    }

    pub fn create_note(&mut self, text: impl Into<String>) -> NotesResult<Note> {
        let text = text.into();
        let note = self.repo.create_note(text.as_str())?;
        self.publish_if_required()?;
        Ok(note)
    }

    pub fn delete_note(&mut self, id: &NoteId) -> NotesResult<MutationOutcome> {
        let outcome = self.repo.delete_note(id)?;
        self.finish("note_delete", outcome)
    }

    pub fn set_text(
        &mut self,
        id: &NoteId,
        text: impl Into<String>,
    ) -> NotesResult<MutationOutcome> {
        let text = text.into();
        let outcome = self.repo.set_text(id, text.as_str())?;
        self.finish("note_text_set", outcome)
    }

    pub fn set_children(
        &mut self,
        id: &NoteId,
        children: &[NoteId],
    ) -> NotesResult<MutationOutcome> {
        let outcome = self.repo.set_children(id, children)?;
        self.finish("note_children_set", outcome)
    }

    /// Inserts `child_id` under `id`; negative positions count from the end.
    pub fn add_child(
        &mut self,
        id: &NoteId,
        child_id: &NoteId,
        position: isize,
    ) -> NotesResult<MutationOutcome> {
        let outcome = self.repo.add_child(id, child_id, position)?;
        self.finish("note_child_add", outcome)
    }

    /// Removes the occurrence `segment` names under `id`.
    pub fn remove_child(&mut self, id: &NoteId, segment: &Segment) -> NotesResult<MutationOutcome> {
        let outcome = self
            .repo
            .remove_child(id, &segment.id, segment.iteration)?;
        self.finish("note_child_remove", outcome)
    }

    /// Moves the occurrence `segment` names under `from_id` to `to_position`
    /// under `to_id`.
    pub fn move_child(
        &mut self,
        from_id: &NoteId,
        segment: &Segment,
        to_id: &NoteId,
        to_position: isize,
    ) -> NotesResult<MutationOutcome> {
        let outcome = self.repo.move_child(
            &segment.id,
            from_id,
            segment.iteration,
            to_id,
            to_position,
        )?;
        self.finish("note_child_move", outcome)
    }

    pub fn clear_all(&mut self) -> NotesResult<()> {
        self.repo.clear_all()?;
        self.publish_if_required()?;
        Ok(())
    }

    fn finish(
        &mut self,
        event: &'static str,
        outcome: MutationOutcome,
    ) -> NotesResult<MutationOutcome> {
        match outcome {
            MutationOutcome::Applied => {
                self.publish_if_required()?;
            }
            MutationOutcome::Unchanged => {
                debug!("event={event} module=notes_service status=unchanged");
            }
            MutationOutcome::Stale => {
                warn!("event={event} module=notes_service status=stale");
            }
        }
        Ok(outcome)
    }

    fn publish_if_required(&mut self) -> NotesResult<()> {
        let store_id = self.repo.store_id()?;
        self.emitter.publish_if_changed(store_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::NotesService;
    use crate::model::path::Segment;
    use crate::repo::memory_repo::MemoryNoteRepository;
    use crate::repo::MutationOutcome;

    #[test]
    fn applied_mutations_publish_new_store_ids() {
        let mut service = NotesService::new(MemoryNoteRepository::new());
        let receiver = service.subscribe();

        let parent = service.create_note("parent").unwrap();
        let child = service.create_note("child").unwrap();
        service.add_child(&parent.id, &child.id, -1).unwrap();

        let ids = receiver
            .try_iter()
            .map(|event| event.store_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn stale_mutations_publish_nothing() {
        let mut service = NotesService::new(MemoryNoteRepository::new());
        let parent = service.create_note("parent").unwrap();
        let child = service.create_note("child").unwrap();
        let receiver = service.subscribe();

        let outcome = service
            .remove_child(&parent.id, &Segment::new(child.id.clone(), 0))
            .unwrap();
        assert_eq!(outcome, MutationOutcome::Stale);
        assert!(receiver.try_recv().is_err());
    }
}
