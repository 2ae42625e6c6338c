//! Child-list algorithms shared by every note store.
//!
//! # Responsibility
//! - Resolve an occurrence (`id` + iteration) to an index by linear scan.
//! - Resolve signed insert positions to indices.
//! - Apply insert/remove/move edits to one or two child lists.
//!
//! # Invariants
//! - Occurrence indices are derived on demand and never cached.
//! - Every function leaves its input untouched when it reports failure.

use crate::model::note::NoteId;

/// Finds the index of the `iteration`-th occurrence of `child_id`.
///
/// The returned index is in `[0, children.len())`. Returns `None` when fewer
/// than `iteration + 1` occurrences exist.
pub fn resolve_child_iteration(
    children: &[NoteId],
    child_id: &NoteId,
    iteration: usize,
) -> Option<usize> {
    let mut from = 0;
    let mut remaining = iteration;
    loop {
        let offset = children[from..].iter().position(|it| it == child_id)?;
        let index = from + offset;
        if remaining == 0 {
            return Some(index);
        }
        remaining -= 1;
        from = index + 1;
    }
}

/// Resolves a signed insert position into an index in `[0, children.len()]`.
///
/// ```text
/// Child     [ a,  b,  c]  _
/// Position    0   1   2   3
/// Position   -4  -3  -2  -1
/// ```
pub fn resolve_child_position(children: &[NoteId], position: isize) -> usize {
    let len = children.len();
    if position >= 0 {
        position.unsigned_abs().min(len)
    } else {
        let from_end = position.unsigned_abs() - 1;
        len.saturating_sub(from_end)
    }
}

/// Inserts `child_id` at the resolved `position`.
pub fn insert_child(children: &mut Vec<NoteId>, child_id: NoteId, position: isize) {
    let index = resolve_child_position(children, position);
    children.insert(index, child_id);
}

/// Removes one occurrence. Returns `false` if the occurrence does not exist.
pub fn remove_child(children: &mut Vec<NoteId>, child_id: &NoteId, iteration: usize) -> bool {
    match resolve_child_iteration(children, child_id, iteration) {
        Some(index) => {
            children.remove(index);
            true
        }
        None => false,
    }
}

/// Moves one occurrence within a single child list.
///
/// `position` is expressed in coordinates from before the removal, so a
/// target behind the removed entry shifts left by one.
pub fn move_child_within(
    children: &mut Vec<NoteId>,
    child_id: &NoteId,
    iteration: usize,
    position: isize,
) -> bool {
    let Some(from_index) = resolve_child_iteration(children, child_id, iteration) else {
        return false;
    };
    let mut to_index = resolve_child_position(children, position);
    if from_index < to_index {
        to_index -= 1;
    }
    let moved = children.remove(from_index);
    children.insert(to_index, moved);
    true
}

/// Moves one occurrence from `from` into `to` at `position`.
pub fn move_child_between(
    from: &mut Vec<NoteId>,
    child_id: &NoteId,
    iteration: usize,
    to: &mut Vec<NoteId>,
    position: isize,
) -> bool {
    let Some(from_index) = resolve_child_iteration(from, child_id, iteration) else {
        return false;
    };
    let to_index = resolve_child_position(to, position);
    let moved = from.remove(from_index);
    to.insert(to_index, moved);
    true
}
