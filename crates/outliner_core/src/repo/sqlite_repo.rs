//! SQLite-backed note graph store.
//!
//! # Responsibility
//! - Persist note text and ordered child lists durably.
//! - Apply child-list edits with the shared `model::children` algorithms
//!   inside one immediate transaction per mutation.
//!
//! # Invariants
//! - `note_children.position` is dense and zero-based per parent after every
//!   committed mutation.
//! - `store_state.revision` is bumped in the same transaction as the change
//!   it reports.

use crate::db::migrations::latest_version;
use crate::model::children;
use crate::model::note::{Note, NoteId};
use crate::repo::{MutationOutcome, NoteRepository, RepoError, RepoResult};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::{BTreeSet, HashSet};

/// Durable note graph store over a migrated connection.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_note_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn begin(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create_note(&mut self, text: &str) -> RepoResult<Note> {
        let tx = self.begin()?;
        let id = loop {
            let candidate = NoteId::generate();
            if !note_exists(&tx, &candidate)? {
                break candidate;
            }
        };
        tx.execute(
            "INSERT INTO notes (id, text) VALUES (?1, ?2);",
            params![id.as_str(), text],
        )?;
        bump_revision(&tx)?;
        tx.commit()?;
        debug!("event=note_create module=sqlite_repo status=ok id={id}");

        Ok(Note {
            id,
            text: text.to_string(),
            children: Vec::new(),
            parents: BTreeSet::new(),
        })
    }

    fn get_note(&self, id: &NoteId) -> RepoResult<Option<Note>> {
        let text: Option<String> = self
            .conn
            .query_row(
                "SELECT text FROM notes WHERE id = ?1;",
                [id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(text) = text else {
            return Ok(None);
        };

        Ok(Some(Note {
            id: id.clone(),
            text,
            children: load_children(self.conn, id)?,
            parents: load_parents(self.conn, id)?,
        }))
    }

    fn get_children(&self, id: &NoteId) -> RepoResult<Option<Vec<NoteId>>> {
        if !note_exists(self.conn, id)? {
            return Ok(None);
        }
        Ok(Some(load_children(self.conn, id)?))
    }

    fn set_text(&mut self, id: &NoteId, text: &str) -> RepoResult<MutationOutcome> {
        let tx = self.begin()?;
        let current: Option<String> = tx
            .query_row(
                "SELECT text FROM notes WHERE id = ?1;",
                [id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match current {
            None => return Ok(MutationOutcome::Stale),
            Some(current) if current == text => return Ok(MutationOutcome::Unchanged),
            Some(_) => {}
        }

        tx.execute(
            "UPDATE notes
             SET text = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.as_str(), text],
        )?;
        bump_revision(&tx)?;
        tx.commit()?;
        Ok(MutationOutcome::Applied)
    }

    fn set_children(&mut self, id: &NoteId, children: &[NoteId]) -> RepoResult<MutationOutcome> {
        let tx = self.begin()?;
        if !note_exists(&tx, id)? {
            return Ok(MutationOutcome::Stale);
        }

        let mut known = HashSet::new();
        let mut retained = Vec::with_capacity(children.len());
        for child in children {
            if known.contains(child) || note_exists(&tx, child)? {
                known.insert(child.clone());
                retained.push(child.clone());
            }
        }

        if load_children(&tx, id)? == retained {
            return Ok(MutationOutcome::Unchanged);
        }
        write_children(&tx, id, &retained)?;
        bump_revision(&tx)?;
        tx.commit()?;
        Ok(MutationOutcome::Applied)
    }

    fn add_child(
        &mut self,
        id: &NoteId,
        child_id: &NoteId,
        position: isize,
    ) -> RepoResult<MutationOutcome> {
        let tx = self.begin()?;
        if !note_exists(&tx, id)? || !note_exists(&tx, child_id)? {
            return Ok(MutationOutcome::Stale);
        }

        let mut list = load_children(&tx, id)?;
        children::insert_child(&mut list, child_id.clone(), position);
        write_children(&tx, id, &list)?;
        bump_revision(&tx)?;
        tx.commit()?;
        Ok(MutationOutcome::Applied)
    }

    fn remove_child(
        &mut self,
        id: &NoteId,
        child_id: &NoteId,
        iteration: usize,
    ) -> RepoResult<MutationOutcome> {
        let tx = self.begin()?;
        if !note_exists(&tx, id)? {
            return Ok(MutationOutcome::Stale);
        }

        let mut list = load_children(&tx, id)?;
        if !children::remove_child(&mut list, child_id, iteration) {
            return Ok(MutationOutcome::Stale);
        }
        write_children(&tx, id, &list)?;
        bump_revision(&tx)?;
        tx.commit()?;
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
        let tx = self.begin()?;
        if !note_exists(&tx, from_id)? || !note_exists(&tx, to_id)? {
            return Ok(MutationOutcome::Stale);
        }

        if from_id == to_id {
            let mut list = load_children(&tx, from_id)?;
            if !children::move_child_within(&mut list, child_id, from_iteration, to_position) {
                return Ok(MutationOutcome::Stale);
            }
            write_children(&tx, from_id, &list)?;
        } else {
            let mut from_list = load_children(&tx, from_id)?;
            let mut to_list = load_children(&tx, to_id)?;
            if !children::move_child_between(
                &mut from_list,
                child_id,
                from_iteration,
                &mut to_list,
                to_position,
            ) {
                return Ok(MutationOutcome::Stale);
            }
            write_children(&tx, from_id, &from_list)?;
            write_children(&tx, to_id, &to_list)?;
        }

        bump_revision(&tx)?;
        tx.commit()?;
        Ok(MutationOutcome::Applied)
    }

    fn delete_note(&mut self, id: &NoteId) -> RepoResult<MutationOutcome> {
        let tx = self.begin()?;
        if !note_exists(&tx, id)? {
            return Ok(MutationOutcome::Stale);
        }

        let mut affected = Vec::new();
        for parent in load_parents(&tx, id)? {
            if &parent == id {
                continue;
            }
            let mut list = load_children(&tx, &parent)?;
            list.retain(|child| child != id);
            affected.push((parent, list));
        }

        // Cascades both the note's own child rows and rows pointing at it.
        tx.execute("DELETE FROM notes WHERE id = ?1;", [id.as_str()])?;
        for (parent, list) in &affected {
            write_children(&tx, parent, list)?;
        }
        bump_revision(&tx)?;
        tx.commit()?;
        debug!(
            "event=note_delete module=sqlite_repo status=ok id={id} affected_parents={}",
            affected.len()
        );
        Ok(MutationOutcome::Applied)
    }

    fn clear_all(&mut self) -> RepoResult<()> {
        let tx = self.begin()?;
        tx.execute("DELETE FROM note_children;", [])?;
        let removed = tx.execute("DELETE FROM notes;", [])?;
        bump_revision(&tx)?;
        tx.commit()?;
        info!("event=notes_clear module=sqlite_repo status=ok removed={removed}");
        Ok(())
    }

    fn store_id(&self) -> RepoResult<u64> {
        let revision: i64 = self.conn.query_row(
            "SELECT revision FROM store_state WHERE singleton = 0;",
            [],
            |row| row.get(0),
        )?;
        u64::try_from(revision).map_err(|_| {
            RepoError::InvalidData(format!("invalid revision `{revision}` in store_state"))
        })
    }

    fn note_count(&self) -> RepoResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("invalid note count `{count}`")))
    }
}

fn note_exists(conn: &Connection, id: &NoteId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1);",
        [id.as_str()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn load_children(conn: &Connection, id: &NoteId) -> RepoResult<Vec<NoteId>> {
    let mut stmt = conn.prepare(
        "SELECT child_id
         FROM note_children
         WHERE parent_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([id.as_str()])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        result.push(NoteId::from_raw(value));
    }
    Ok(result)
}

fn load_parents(conn: &Connection, id: &NoteId) -> RepoResult<BTreeSet<NoteId>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT parent_id
         FROM note_children
         WHERE child_id = ?1;",
    )?;
    let mut rows = stmt.query([id.as_str()])?;
    let mut result = BTreeSet::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        result.insert(NoteId::from_raw(value));
    }
    Ok(result)
}

fn write_children(conn: &Connection, id: &NoteId, list: &[NoteId]) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM note_children WHERE parent_id = ?1;",
        [id.as_str()],
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO note_children (parent_id, position, child_id) VALUES (?1, ?2, ?3);",
    )?;
    for (position, child) in list.iter().enumerate() {
        stmt.execute(params![id.as_str(), position as i64, child.as_str()])?;
    }
    conn.execute(
        "UPDATE notes
         SET updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        [id.as_str()],
    )?;
    Ok(())
}

fn bump_revision(conn: &Connection) -> RepoResult<()> {
    conn.execute(
        "UPDATE store_state SET revision = revision + 1 WHERE singleton = 0;",
        [],
    )?;
    Ok(())
}

fn ensure_note_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["notes", "note_children", "store_state"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
