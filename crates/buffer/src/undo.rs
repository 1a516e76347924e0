// Chunk: docs/chunks/undo_history - Mergeable, bounded undo/redo history

//! Undo history.
//!
//! The engine only records and plans. It never touches the text: `undo()` and
//! `redo()` return a [`Replay`] describing the edits to apply, and the document
//! applies them through its ordinary mutation path with recording switched
//! off. That keeps the text store, line index and positions updated by one
//! code path no matter where an edit comes from.
//!
//! History entries are atomic edits or compound edits (a flat list of atomic
//! edits recorded between the outermost `begin_compound`/`end_compound`).
//! Adjacent single edits merge, so typing a word is one entry.

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;

use crate::config::DEFAULT_UNDO_LIMIT;
use crate::error::{BufferError, Result};
use crate::types::UndoId;

/// Receives deleted text, e.g. to fill an editor kill ring.
///
/// Consecutive deletions that merge into one history entry are reported as
/// one growing entry: `add` for the first, `changed` with the merged text for
/// each extension.
pub trait KillRing: Send + Sync {
    fn add(&self, text: &str);
    fn changed(&self, text: &str);
}

/// Identifies one atomic edit within an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditId(u64);

/// An atomic insertion or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub id: EditId,
    pub offset: usize,
    /// Length of `text`, in chars.
    pub len: usize,
    pub text: String,
}

/// One history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Insert(TextEdit),
    Remove(TextEdit),
    /// Atomic edits in the order they were applied.
    Compound(Vec<Edit>),
}

impl Edit {
    fn is_atomic(&self) -> bool {
        !matches!(self, Edit::Compound(_))
    }

    fn atomic_id(&self) -> Option<EditId> {
        match self {
            Edit::Insert(edit) | Edit::Remove(edit) => Some(edit.id),
            Edit::Compound(_) => None,
        }
    }

    fn first_atomic_id(&self) -> Option<EditId> {
        match self {
            Edit::Compound(edits) => edits.first().and_then(Edit::first_atomic_id),
            atomic => atomic.atomic_id(),
        }
    }

    fn last_atomic_id(&self) -> Option<EditId> {
        match self {
            Edit::Compound(edits) => edits.last().and_then(Edit::last_atomic_id),
            atomic => atomic.atomic_id(),
        }
    }

    fn contains(&self, id: EditId) -> bool {
        match self {
            Edit::Compound(edits) => edits.iter().any(|edit| edit.contains(id)),
            atomic => atomic.atomic_id() == Some(id),
        }
    }

    /// Atomic edits in application order.
    fn atomics(&self) -> Vec<&Edit> {
        match self {
            Edit::Compound(edits) => edits.iter().flat_map(Edit::atomics).collect(),
            atomic => vec![atomic],
        }
    }
}

/// A text operation the document must apply to replay history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOp {
    Insert { offset: usize, text: String },
    Remove { offset: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayStep {
    pub op: ReplayOp,
    /// Applying this step returns the document to its last saved state.
    pub clears_dirty: bool,
}

/// Plan for one undo or redo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    /// Steps in the order they must be applied.
    pub steps: Vec<ReplayStep>,
    /// Caret offset after the last step.
    pub caret: usize,
}

/// Records edits and plans their reversal.
pub struct UndoEngine {
    /// Oldest at the front.
    undos: VecDeque<Edit>,
    /// Most recently undone at the end.
    redos: Vec<Edit>,
    /// Open compound edit, if any.
    compound: Option<Vec<Edit>>,
    compound_depth: usize,
    limit: usize,
    /// Undoing this edit returns to the saved state.
    undo_clear_dirty: Option<EditId>,
    /// Redoing this edit returns to the saved state.
    redo_clear_dirty: Option<EditId>,
    undo_id: UndoId,
    /// `undo_id` was already minted for the next entry by a `prepare_*` call.
    prepared: bool,
    next_edit_id: u64,
    kill_ring: Option<Arc<dyn KillRing>>,
}

impl UndoEngine {
    pub fn new(limit: usize) -> Self {
        Self {
            undos: VecDeque::new(),
            redos: Vec::new(),
            compound: None,
            compound_depth: 0,
            limit,
            undo_clear_dirty: None,
            redo_clear_dirty: None,
            undo_id: UndoId::mint(),
            prepared: false,
            next_edit_id: 0,
            kill_ring: None,
        }
    }

    pub fn set_kill_ring(&mut self, kill_ring: Option<Arc<dyn KillRing>>) {
        self.kill_ring = kill_ring;
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Changes the history bound, dropping the oldest entries at once if the
    /// history is already longer.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.trim();
    }

    pub fn can_undo(&self) -> bool {
        !self.undos.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redos.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undos.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redos.len()
    }

    pub fn in_compound(&self) -> bool {
        self.compound_depth > 0
    }

    /// Identity of the logical operation currently in progress.
    pub fn undo_id(&self) -> UndoId {
        self.undo_id
    }

    /// Forgets all history and save-point markers.
    ///
    /// An open compound edit stays open but loses what it collected.
    pub fn clear(&mut self) {
        self.undos.clear();
        self.redos.clear();
        if let Some(compound) = &mut self.compound {
            compound.clear();
        }
        self.undo_clear_dirty = None;
        self.redo_clear_dirty = None;
        self.prepared = false;
    }

    // ==================== Compound edits ====================

    pub fn begin_compound(&mut self) {
        if self.compound_depth == 0 {
            self.compound = Some(Vec::new());
            self.undo_id = UndoId::mint();
        }
        self.compound_depth += 1;
    }

    /// Closes one nesting level. Returns false, and does nothing else, if no
    /// compound edit is open.
    pub fn end_compound(&mut self) -> bool {
        if self.compound_depth == 0 {
            tracing::warn!("end_compound called without a matching begin_compound");
            return false;
        }
        self.compound_depth -= 1;
        if self.compound_depth == 0 {
            let mut edits = self.compound.take().unwrap_or_default();
            match edits.len() {
                0 => {}
                1 => {
                    if let Some(edit) = edits.pop() {
                        self.commit(edit);
                    }
                }
                _ => self.commit(Edit::Compound(edits)),
            }
        }
        true
    }

    // ==================== Recording ====================

    /// Returns the undo id an insertion at `offset` will be recorded under.
    ///
    /// Call right before [`record_insert`](Self::record_insert) with the same
    /// arguments, so notifications sent ahead of the recording can already
    /// carry the edit's id. Mints a fresh id unless the insertion joins an
    /// open compound edit or merges into the previous entry.
    pub fn prepare_insert(&mut self, offset: usize, clears_dirty: bool) -> UndoId {
        let merges = !clears_dirty && self.insert_merges(offset);
        self.prepare(merges)
    }

    /// Removal counterpart of [`prepare_insert`](Self::prepare_insert).
    pub fn prepare_remove(&mut self, offset: usize, len: usize, clears_dirty: bool) -> UndoId {
        let merges = !clears_dirty && self.remove_merges(offset, len);
        self.prepare(merges)
    }

    fn prepare(&mut self, merges: bool) -> UndoId {
        if !merges && self.compound.is_none() {
            self.undo_id = UndoId::mint();
            self.prepared = true;
        }
        self.undo_id
    }

    /// Records an insertion of `text` (`len` chars) at `offset`.
    ///
    /// `clears_dirty` is true when the document was clean before the edit.
    pub fn record_insert(&mut self, offset: usize, len: usize, text: &str, clears_dirty: bool) {
        if !clears_dirty && self.insert_merges(offset) {
            if let Some(Edit::Insert(prev)) = self.merge_target() {
                if prev.offset == offset {
                    prev.text.insert_str(0, text);
                } else {
                    prev.text.push_str(text);
                }
                prev.len += len;
                return;
            }
        }

        let edit = self.new_text_edit(offset, len, text, clears_dirty);
        self.push(Edit::Insert(edit));
    }

    /// Records a removal of `text` (`len` chars) that started at `offset`.
    pub fn record_remove(&mut self, offset: usize, len: usize, text: &str, clears_dirty: bool) {
        if !clears_dirty && self.remove_merges(offset, len) {
            let kill_ring = self.kill_ring.clone();
            if let Some(Edit::Remove(prev)) = self.merge_target() {
                if prev.offset == offset {
                    // Forward delete: the next char removed sits at the same offset
                    prev.text.push_str(text);
                } else {
                    // Backspace: the removed span ends where the previous began
                    prev.text.insert_str(0, text);
                    prev.offset = offset;
                }
                prev.len += len;
                if let Some(kill_ring) = kill_ring {
                    kill_ring.changed(&prev.text);
                }
                return;
            }
        }

        if let Some(kill_ring) = &self.kill_ring {
            kill_ring.add(text);
        }
        let edit = self.new_text_edit(offset, len, text, clears_dirty);
        self.push(Edit::Remove(edit));
    }

    fn insert_merges(&self, offset: usize) -> bool {
        matches!(
            self.merge_candidate(),
            Some(Edit::Insert(prev)) if prev.offset == offset || prev.offset + prev.len == offset
        )
    }

    fn remove_merges(&self, offset: usize, len: usize) -> bool {
        matches!(
            self.merge_candidate(),
            Some(Edit::Remove(prev)) if prev.offset == offset || offset + len == prev.offset
        )
    }

    fn new_text_edit(
        &mut self,
        offset: usize,
        len: usize,
        text: &str,
        clears_dirty: bool,
    ) -> TextEdit {
        let id = EditId(self.next_edit_id);
        self.next_edit_id += 1;
        if clears_dirty {
            self.redo_clear_dirty = self.last_recorded_id();
            self.undo_clear_dirty = Some(id);
        }
        TextEdit {
            id,
            offset,
            len,
            text: text.to_owned(),
        }
    }

    /// The entry a new atomic edit may merge into. Nothing merges while
    /// there are redos to discard.
    fn merge_candidate(&self) -> Option<&Edit> {
        if !self.redos.is_empty() {
            return None;
        }
        match &self.compound {
            Some(compound) => compound.last(),
            None => self.undos.back().filter(|edit| edit.is_atomic()),
        }
    }

    fn merge_target(&mut self) -> Option<&mut Edit> {
        match &mut self.compound {
            Some(compound) => compound.last_mut(),
            None => self.undos.back_mut().filter(|edit| edit.is_atomic()),
        }
    }

    fn last_recorded_id(&self) -> Option<EditId> {
        self.compound
            .as_ref()
            .and_then(|compound| compound.last())
            .or(self.undos.back())
            .and_then(Edit::last_atomic_id)
    }

    fn push(&mut self, edit: Edit) {
        if let Some(compound) = &mut self.compound {
            compound.push(edit);
        } else {
            if !mem::take(&mut self.prepared) {
                self.undo_id = UndoId::mint();
            }
            self.commit(edit);
        }
    }

    fn commit(&mut self, edit: Edit) {
        self.undos.push_back(edit);
        self.clear_redos();
        self.trim();
    }

    fn clear_redos(&mut self) {
        for edit in self.redos.drain(..) {
            if self.undo_clear_dirty.is_some_and(|id| edit.contains(id)) {
                self.undo_clear_dirty = None;
            }
            if self.redo_clear_dirty.is_some_and(|id| edit.contains(id)) {
                self.redo_clear_dirty = None;
            }
        }
    }

    fn trim(&mut self) {
        while self.undos.len() > self.limit {
            let Some(dropped) = self.undos.pop_front() else {
                break;
            };
            if self.undo_clear_dirty.is_some_and(|id| dropped.contains(id)) {
                self.undo_clear_dirty = None;
            }
            if self.redo_clear_dirty.is_some_and(|id| dropped.contains(id)) {
                self.redo_clear_dirty = None;
            }
            tracing::trace!(limit = self.limit, "dropped oldest undo entry");
        }
    }

    // ==================== Replay ====================

    /// Plans the reversal of the most recent entry and moves it to the redo
    /// queue. `Ok(None)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<Option<Replay>> {
        if self.in_compound() {
            return Err(BufferError::CompoundEditOpen);
        }
        self.undo_id = UndoId::mint();
        let Some(edit) = self.undos.pop_back() else {
            return Ok(None);
        };

        let mut steps = Vec::new();
        let mut caret = 0;
        for atomic in edit.atomics().into_iter().rev() {
            let (op, id) = match atomic {
                Edit::Insert(ins) => {
                    caret = ins.offset;
                    (remove_op(ins), ins.id)
                }
                Edit::Remove(rem) => {
                    caret = rem.offset + rem.len;
                    (insert_op(rem), rem.id)
                }
                Edit::Compound(_) => continue,
            };
            steps.push(ReplayStep {
                op,
                clears_dirty: self.undo_clear_dirty == Some(id),
            });
        }

        self.redos.push(edit);
        Ok(Some(Replay { steps, caret }))
    }

    /// Plans the reapplication of the most recently undone entry and moves
    /// it back to the undo queue. `Ok(None)` when there is nothing to redo.
    pub fn redo(&mut self) -> Result<Option<Replay>> {
        if self.in_compound() {
            return Err(BufferError::CompoundEditOpen);
        }
        self.undo_id = UndoId::mint();
        let Some(edit) = self.redos.pop() else {
            return Ok(None);
        };

        let mut steps = Vec::new();
        let mut caret = 0;
        for atomic in edit.atomics() {
            let (op, id) = match atomic {
                Edit::Insert(ins) => {
                    caret = ins.offset + ins.len;
                    (insert_op(ins), ins.id)
                }
                Edit::Remove(rem) => {
                    caret = rem.offset;
                    (remove_op(rem), rem.id)
                }
                Edit::Compound(_) => continue,
            };
            steps.push(ReplayStep {
                op,
                clears_dirty: self.redo_clear_dirty == Some(id),
            });
        }

        self.undos.push_back(edit);
        Ok(Some(Replay { steps, caret }))
    }

    /// Moves the save point to the current history position.
    pub fn reset_clear_dirty(&mut self) {
        self.redo_clear_dirty = self.undos.back().and_then(Edit::last_atomic_id);
        self.undo_clear_dirty = self.redos.last().and_then(Edit::first_atomic_id);
    }
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_LIMIT)
    }
}

impl std::fmt::Debug for UndoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoEngine")
            .field("undos", &self.undos.len())
            .field("redos", &self.redos.len())
            .field("compound_depth", &self.compound_depth)
            .field("limit", &self.limit)
            .field("undo_id", &self.undo_id)
            .finish_non_exhaustive()
    }
}

fn insert_op(edit: &TextEdit) -> ReplayOp {
    ReplayOp::Insert {
        offset: edit.offset,
        text: edit.text.clone(),
    }
}

fn remove_op(edit: &TextEdit) -> ReplayOp {
    ReplayOp::Remove {
        offset: edit.offset,
        len: edit.len,
    }
}
