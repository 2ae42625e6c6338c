//! In-process note graph store.
//!
//! # Responsibility
//! - Hold the whole graph in memory for sessions without durable storage
//!   and for tests.
//! - Maintain the derived parent index after every structural change.
//!
//! # Invariants
//! - `parents[c][p]` equals the number of occurrences of `c` in `p`'s
//!   child list.
//! - Child lists never name a note that does not exist.

use crate::model::children;
use crate::model::note::{Note, NoteId};
use crate::repo::{MutationOutcome, NoteRepository, RepoResult};
use log::debug;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
struct NoteInfo {
    text: String,
    children: Vec<NoteId>,
}

/// Note graph kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryNoteRepository {
    revision: u64,
    notes: HashMap<NoteId, NoteInfo>,
    parents: HashMap<NoteId, HashMap<NoteId, usize>>,
}

impl MemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&mut self) {
        self.revision += 1;
    }

    fn make_consistent_and_tick(&mut self) {
        let existing = self.notes.keys().cloned().collect::<HashSet<_>>();
        for info in self.notes.values_mut() {
            info.children.retain(|child| existing.contains(child));
        }

        self.parents.clear();
        for (id, info) in &self.notes {
            for child in &info.children {
                *self
                    .parents
                    .entry(child.clone())
                    .or_default()
                    .entry(id.clone())
                    .or_default() += 1;
            }
        }

        self.tick();
    }

    fn fresh_id(&self) -> NoteId {
        loop {
            let id = NoteId::generate();
            if !self.notes.contains_key(&id) {
                return id;
            }
        }
    }
}

impl NoteRepository for MemoryNoteRepository {
    fn create_note(&mut self, text: &str) -> RepoResult<Note> {
        let id = self.fresh_id();
        self.notes.insert(
            id.clone(),
            NoteInfo {
                text: text.to_string(),
                children: Vec::new(),
            },
        );
        self.make_consistent_and_tick();
        debug!("event=note_create module=memory_repo status=ok id={id}");

        Ok(Note {
            id,
            text: text.to_string(),
            children: Vec::new(),
            parents: Default::default(),
        })
    }

    fn get_note(&self, id: &NoteId) -> RepoResult<Option<Note>> {
        let Some(info) = self.notes.get(id) else {
            return Ok(None);
        };
        let parents = self
            .parents
            .get(id)
            .map(|ps| ps.keys().cloned().collect())
            .unwrap_or_default();

        Ok(Some(Note {
            id: id.clone(),
            text: info.text.clone(),
            children: info.children.clone(),
            parents,
        }))
    }

    fn set_text(&mut self, id: &NoteId, text: &str) -> RepoResult<MutationOutcome> {
        let Some(note) = self.notes.get_mut(id) else {
            return Ok(MutationOutcome::Stale);
        };
        if note.text == text {
            return Ok(MutationOutcome::Unchanged);
        }
        note.text = text.to_string();
        self.tick();
        Ok(MutationOutcome::Applied)
    }

    fn set_children(&mut self, id: &NoteId, children: &[NoteId]) -> RepoResult<MutationOutcome> {
        let Some(note) = self.notes.get_mut(id) else {
            return Ok(MutationOutcome::Stale);
        };
        if note.children == children {
            return Ok(MutationOutcome::Unchanged);
        }
        note.children = children.to_vec();
        self.make_consistent_and_tick();
        Ok(MutationOutcome::Applied)
    }

    fn add_child(
        &mut self,
        id: &NoteId,
        child_id: &NoteId,
        position: isize,
    ) -> RepoResult<MutationOutcome> {
        if !self.notes.contains_key(child_id) {
            return Ok(MutationOutcome::Stale);
        }
        let Some(note) = self.notes.get_mut(id) else {
            return Ok(MutationOutcome::Stale);
        };
        children::insert_child(&mut note.children, child_id.clone(), position);
        self.make_consistent_and_tick();
        Ok(MutationOutcome::Applied)
    }

    fn remove_child(
        &mut self,
        id: &NoteId,
        child_id: &NoteId,
        iteration: usize,
    ) -> RepoResult<MutationOutcome> {
        let Some(note) = self.notes.get_mut(id) else {
            return Ok(MutationOutcome::Stale);
        };
        if !children::remove_child(&mut note.children, child_id, iteration) {
            return Ok(MutationOutcome::Stale);
        }
        self.make_consistent_and_tick();
        Ok(MutationOutcome::Applied)
    }

    fn move_child(
        &mut self,
        child_id: &NoteId,
        from_id: &NoteId,
        from_iteration: usize,
        to_id: &NoteId,
        to_position: isize,
    ) -> RepoResult<MutationOutcome> {
        if !self.notes.contains_key(from_id) || !self.notes.contains_key(to_id) {
            return Ok(MutationOutcome::Stale);
        }

        let moved = if from_id == to_id {
            let Some(note) = self.notes.get_mut(from_id) else {
                return Ok(MutationOutcome::Stale);
            };
            children::move_child_within(&mut note.children, child_id, from_iteration, to_position)
        } else {
            // Take the source list out so both lists can be borrowed mutably.
            let mut from_children = match self.notes.get_mut(from_id) {
                Some(note) => std::mem::take(&mut note.children),
                None => return Ok(MutationOutcome::Stale),
            };
            let moved = match self.notes.get_mut(to_id) {
                Some(to) => children::move_child_between(
                    &mut from_children,
                    child_id,
                    from_iteration,
                    &mut to.children,
                    to_position,
                ),
                None => false,
            };
            if let Some(note) = self.notes.get_mut(from_id) {
                note.children = from_children;
            }
            moved
        };

        if !moved {
            return Ok(MutationOutcome::Stale);
        }
        self.make_consistent_and_tick();
        Ok(MutationOutcome::Applied)
    }

    fn delete_note(&mut self, id: &NoteId) -> RepoResult<MutationOutcome> {
        if self.notes.remove(id).is_none() {
            return Ok(MutationOutcome::Stale);
        }
        self.make_consistent_and_tick();
        debug!("event=note_delete module=memory_repo status=ok id={id}");
        Ok(MutationOutcome::Applied)
    }

    fn clear_all(&mut self) -> RepoResult<()> {
        self.notes.clear();
        self.make_consistent_and_tick();
        Ok(())
    }

    fn store_id(&self) -> RepoResult<u64> {
        Ok(self.revision)
    }

    fn note_count(&self) -> RepoResult<usize> {
        Ok(self.notes.len())
    }
}
