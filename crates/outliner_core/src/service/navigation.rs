//! Per-session navigation state machine.
//!
//! # Responsibility
//! - Own anchor, focus, fold state, interaction mode, anchor history and pin.
//! - Repair dependent state whenever focus, mode or fold state changes, and
//!   after the underlying graph changed.
//! - Queue change notifications for observers once an operation completed.
//!
//! # Invariants
//! - Every proper ancestor of the focus path is open.
//! - In `Insert` mode the insert path and all of its ancestors are open.
//! - The focus path never points below a closed path.
//! - `Edit` mode forces no opens; closing a path never leaves an `Insert`
//!   target below it.
//! - Notifications are only queued after the invariants above hold again.

use crate::model::children::resolve_child_iteration;
use crate::model::note::NoteId;
use crate::model::path::{Path, PathError, Segment};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Interaction mode of the outline view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Nothing is being edited.
    Focus,
    /// The text of the note at `path` is being edited.
    Edit { path: Path },
    /// A new child is being composed for `index` under the note at `path`.
    Insert { path: Path, index: usize },
}

/// Saved view of one previous anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub anchor_id: NoteId,
    pub focus_path: Path,
    /// Canonical path strings.
    pub open_paths: BTreeSet<String>,
}

/// The single pinned occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub segment: Segment,
    pub parent_id: Option<NoteId>,
}

/// Observer notification, queued after an operation settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationChange {
    AnchorChanged { anchor_id: Option<NoteId> },
    FocusChanged { path: Path },
    ModeChanged { mode: Mode },
    Opened { path: Path },
    Closed { path: Path },
    /// The whole open set was swapped (anchor change, restore).
    OpenPathsReplaced,
    PinChanged { pin: Option<Pin> },
}

/// Serializable navigation state for saving sessions to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationSnapshot {
    pub anchor_id: Option<NoteId>,
    pub focus_path: Path,
    pub open_paths: BTreeSet<String>,
    pub history: Vec<HistoryEntry>,
    pub pinned: Option<Pin>,
}

/// Navigation state of one session.
#[derive(Debug, Clone)]
pub struct NavigationState {
    anchor_id: Option<NoteId>,
    focus_path: Path,
    open_paths: BTreeSet<String>,
    mode: Mode,
    history: Vec<HistoryEntry>,
    pinned: Option<Pin>,
    changes: Vec<NavigationChange>,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationState {
    /// Empty history, no anchor, nothing open, `Focus` mode.
    pub fn new() -> Self {
        Self {
            anchor_id: None,
            focus_path: Path::root(),
            open_paths: BTreeSet::new(),
            mode: Mode::Focus,
            history: Vec::new(),
            pinned: None,
            changes: Vec::new(),
        }
    }

    pub fn anchor_id(&self) -> Option<&NoteId> {
        self.anchor_id.as_ref()
    }

    pub fn focus_path(&self) -> &Path {
        &self.focus_path
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Canonical strings of every open path, sorted.
    pub fn open_paths(&self) -> impl Iterator<Item = &str> {
        self.open_paths.iter().map(String::as_str)
    }

    /// Path the current mode acts on.
    pub fn active_path(&self) -> &Path {
        match &self.mode {
            Mode::Focus => &self.focus_path,
            Mode::Edit { path } | Mode::Insert { path, .. } => path,
        }
    }

    /// Drains queued notifications, oldest first.
    pub fn take_changes(&mut self) -> Vec<NavigationChange> {
        std::mem::take(&mut self.changes)
    }

    // Fold state

    pub fn is_open(&self, path: &Path) -> bool {
        self.open_paths.contains(&path.format())
    }

    /// Opens or closes `path`.
    ///
    /// Closing a path that contains the focus moves the focus up to `path`;
    /// closing a path that hides the `Insert` target returns to `Focus` mode.
    /// An `Edit` target may be folded away.
    pub fn set_open(&mut self, path: &Path, open: bool) {
        if open {
            self.open(path);
        } else {
            self.close(path);
        }
        self.enforce_fold_invariant();
    }

    pub fn toggle_open(&mut self, path: &Path) {
        let open = !self.is_open(path);
        self.set_open(path, open);
    }

    // Mode transitions

    pub fn focus(&mut self) {
        self.set_mode(Mode::Focus);
        self.enforce_fold_invariant();
    }

    pub fn focus_on(&mut self, path: Path) {
        self.set_focus_path(path);
        self.set_mode(Mode::Focus);
        self.enforce_fold_invariant();
    }

    pub fn edit(&mut self, path: Path) {
        self.set_mode(Mode::Edit { path });
        self.enforce_fold_invariant();
    }

    pub fn insert_at(&mut self, path: Path, index: usize) {
        self.set_mode(Mode::Insert { path, index });
        self.enforce_fold_invariant();
    }

    // Anchor history

    /// Makes `id` the displayed root, remembering the current view.
    pub fn push_anchor_id(&mut self, id: NoteId) {
        if let Some(anchor_id) = self.anchor_id.take() {
            self.history.push(HistoryEntry {
                anchor_id,
                focus_path: std::mem::take(&mut self.focus_path),
                open_paths: std::mem::take(&mut self.open_paths),
            });
        }

        debug!(
            "event=anchor_push module=navigation status=ok history_len={}",
            self.history.len()
        );
        self.replace_view(Some(id), Path::root(), BTreeSet::new());
    }

    /// Returns to the most recently pushed anchor. No-op on empty history.
    pub fn pop_anchor_id(&mut self) {
        let Some(entry) = self.history.pop() else {
            return;
        };
        debug!(
            "event=anchor_pop module=navigation status=ok history_len={}",
            self.history.len()
        );
        self.replace_view(Some(entry.anchor_id), entry.focus_path, entry.open_paths);
    }

    // Pin

    pub fn pinned(&self) -> Option<&Pin> {
        self.pinned.as_ref()
    }

    pub fn is_pinned(&self, segment: &Segment, parent_id: Option<&NoteId>) -> bool {
        match &self.pinned {
            Some(pin) => pin.segment == *segment && pin.parent_id.as_ref() == parent_id,
            None => false,
        }
    }

    pub fn set_pinned(&mut self, segment: Segment, parent_id: Option<NoteId>) {
        let pin = Pin { segment, parent_id };
        self.pinned = Some(pin.clone());
        self.changes
            .push(NavigationChange::PinChanged { pin: Some(pin) });
    }

    pub fn unset_pinned(&mut self) {
        if self.pinned.take().is_some() {
            self.changes.push(NavigationChange::PinChanged { pin: None });
        }
    }

    // Graph repair

    /// Re-resolves focus, mode and fold state against the current graph.
    ///
    /// `children_of` returns the child list of a note, or `None` if the note
    /// no longer exists. The focus path is cut back to its longest prefix
    /// that still resolves, an `Edit`/`Insert` target that no longer resolves
    /// returns to `Focus`, and open paths that no longer resolve are dropped.
    pub fn revalidate<F>(&mut self, children_of: F)
    where
        F: Fn(&NoteId) -> Option<Vec<NoteId>>,
    {
        let Some(anchor_id) = self.anchor_id.clone() else {
            return;
        };
        let resolved_len = |path: &Path| resolved_prefix_len(&anchor_id, path, &children_of);

        let focus_len = resolved_len(&self.focus_path);
        if focus_len < self.focus_path.len() {
            let path = self.focus_path.prefix(focus_len);
            self.set_focus_path(path);
        }

        let mode_resolves = match &self.mode {
            Mode::Focus => true,
            Mode::Edit { path } | Mode::Insert { path, .. } => resolved_len(path) == path.len(),
        };
        if !mode_resolves {
            self.set_mode(Mode::Focus);
        }

        let stale = self
            .open_paths
            .iter()
            .filter(|text| match Path::parse(text) {
                Ok(path) => resolved_len(&path) < path.len(),
                Err(_) => true,
            })
            .cloned()
            .collect::<Vec<_>>();
        for text in stale {
            self.open_paths.remove(&text);
            if let Ok(path) = Path::parse(&text) {
                self.changes.push(NavigationChange::Closed { path });
            }
        }

        self.enforce_fold_invariant();
    }

    /// Every path the state currently names: focus, mode target and open
    /// paths. Open paths that do not parse are skipped.
    pub fn referenced_paths(&self) -> Vec<Path> {
        let mut paths = vec![self.focus_path.clone()];
        match &self.mode {
            Mode::Focus => {}
            Mode::Edit { path } | Mode::Insert { path, .. } => paths.push(path.clone()),
        }
        paths.extend(self.open_paths.iter().filter_map(|text| Path::parse(text).ok()));
        paths
    }

    // Persistence

    pub fn snapshot(&self) -> NavigationSnapshot {
        NavigationSnapshot {
            anchor_id: self.anchor_id.clone(),
            focus_path: self.focus_path.clone(),
            open_paths: self.open_paths.clone(),
            history: self.history.clone(),
            pinned: self.pinned.clone(),
        }
    }

    /// Replaces the whole state with `snapshot`, in `Focus` mode.
    ///
    /// # Errors
    /// - Returns `PathError` if any stored open path is not canonical path
    ///   text; the current state is left untouched.
    pub fn restore(&mut self, snapshot: NavigationSnapshot) -> Result<(), PathError> {
        let all_open = snapshot
            .open_paths
            .iter()
            .chain(snapshot.history.iter().flat_map(|entry| &entry.open_paths));
        for text in all_open {
            Path::parse(text)?;
        }

        self.history = snapshot.history;
        if self.pinned != snapshot.pinned {
            self.pinned = snapshot.pinned;
            self.changes.push(NavigationChange::PinChanged {
                pin: self.pinned.clone(),
            });
        }
        self.replace_view(
            snapshot.anchor_id,
            snapshot.focus_path,
            snapshot.open_paths,
        );
        Ok(())
    }

    /// True when every fold invariant currently holds.
    pub fn is_consistent(&self) -> bool {
        self.required_open_paths()
            .iter()
            .all(|path| self.is_open(path))
    }

    fn replace_view(
        &mut self,
        anchor_id: Option<NoteId>,
        focus_path: Path,
        open_paths: BTreeSet<String>,
    ) {
        self.anchor_id = anchor_id;
        self.focus_path = focus_path;
        self.open_paths = open_paths;
        self.changes.push(NavigationChange::AnchorChanged {
            anchor_id: self.anchor_id.clone(),
        });
        self.changes.push(NavigationChange::FocusChanged {
            path: self.focus_path.clone(),
        });
        self.changes.push(NavigationChange::OpenPathsReplaced);
        self.set_mode(Mode::Focus);
        self.enforce_fold_invariant();
    }

    fn set_focus_path(&mut self, path: Path) {
        if self.focus_path == path {
            return;
        }
        self.focus_path = path;
        self.changes.push(NavigationChange::FocusChanged {
            path: self.focus_path.clone(),
        });
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.changes.push(NavigationChange::ModeChanged {
            mode: self.mode.clone(),
        });
    }

    fn open(&mut self, path: &Path) {
        if self.open_paths.insert(path.format()) {
            self.changes
                .push(NavigationChange::Opened { path: path.clone() });
        }
    }

    fn close(&mut self, path: &Path) {
        if !self.is_open(path) {
            return;
        }

        if path.is_prefix_of(&self.focus_path) {
            self.set_focus_path(path.clone());
        }

        let hides_target = match &self.mode {
            Mode::Focus | Mode::Edit { .. } => false,
            Mode::Insert { path: target, .. } => path.is_prefix_of(target),
        };
        if hides_target {
            self.set_mode(Mode::Focus);
        }

        self.open_paths.remove(&path.format());
        self.changes
            .push(NavigationChange::Closed { path: path.clone() });
    }

    fn required_open_paths(&self) -> Vec<Path> {
        let mut required = self
            .focus_path
            .ancestors()
            .into_iter()
            .skip(1)
            .collect::<Vec<_>>();
        if let Mode::Insert { path, .. } = &self.mode {
            required.extend(path.ancestors());
        }
        required
    }

    fn enforce_fold_invariant(&mut self) {
        for path in self.required_open_paths() {
            self.open(&path);
        }
    }
}

fn resolved_prefix_len<F>(anchor_id: &NoteId, path: &Path, children_of: &F) -> usize
where
    F: Fn(&NoteId) -> Option<Vec<NoteId>>,
{
    let mut current = anchor_id.clone();
    for (index, segment) in path.segments().iter().enumerate() {
        let Some(children) = children_of(&current) else {
            return index;
        };
        if resolve_child_iteration(&children, &segment.id, segment.iteration).is_none() {
            return index;
        }
        current = segment.id.clone();
    }
    path.len()
}

#[cfg(test)]
mod tests {
    use super::{Mode, NavigationChange, NavigationState};
    use crate::model::note::NoteId;
    use crate::model::path::Path;

    fn path(text: &str) -> Path {
        Path::parse(text).expect("test path should parse")
    }

    #[test]
    fn new_state_starts_empty_in_focus_mode() {
        let state = NavigationState::new();
        assert!(state.anchor_id().is_none());
        assert!(state.focus_path().is_empty());
        assert_eq!(state.open_paths().count(), 0);
        assert_eq!(state.mode(), &Mode::Focus);
        assert_eq!(state.history_len(), 0);
    }

    #[test]
    fn set_open_reports_only_real_changes() {
        let mut state = NavigationState::new();
        let target = path("a:0");
        state.set_open(&target, true);
        state.set_open(&target, true);
        state.set_open(&path("b:0"), false);

        assert_eq!(
            state.take_changes(),
            vec![NavigationChange::Opened { path: target }]
        );
    }

    #[test]
    fn edit_leaves_fold_state_alone() {
        let mut state = NavigationState::new();
        state.edit(path("a:0/b:0"));
        assert_eq!(state.open_paths().count(), 0);
        assert_eq!(state.active_path(), &path("a:0/b:0"));

        state.set_open(&path("a:0"), true);
        state.set_open(&path("a:0"), false);
        assert_eq!(state.mode(), &Mode::Edit { path: path("a:0/b:0") });
        assert!(state.is_consistent());
    }

    #[test]
    fn pin_requires_exact_parent_match() {
        let mut state = NavigationState::new();
        let parent = NoteId::from_raw("p");
        let segment = path("x:1").last().cloned().unwrap();

        state.set_pinned(segment.clone(), Some(parent.clone()));
        assert!(state.is_pinned(&segment, Some(&parent)));
        assert!(!state.is_pinned(&segment, None));
        assert!(!state.is_pinned(&path("x:0").last().cloned().unwrap(), Some(&parent)));

        state.unset_pinned();
        assert!(!state.is_pinned(&segment, Some(&parent)));
    }
}
