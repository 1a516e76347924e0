// Chunk: docs/chunks/document_buffer - Document facade, listeners and locking

//! DocumentBuffer is the public face of the document model.
//!
//! It owns the [`DocumentState`] behind a read/write lock, the floating
//! position tracker and the listener registry, and runs every mutation
//! through one path:
//!
//! 1. validate (editable, in bounds)
//! 2. take the write lock
//! 3. update the text store, then the line index, then positions
//! 4. record the edit for undo (unless history is being replayed)
//! 5. notify listeners, still under the lock
//!
//! Queries take the read lock for the duration of one call. Callers that
//! need several queries to agree use [`DocumentBuffer::read`].
//!
//! A listener panic is caught and logged. A panic inside the buffer's own
//! mutation code is not: it leaves the model in an unspecified state and the
//! buffer must not be used afterwards.

use std::mem;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockUpgradableReadGuard};

use crate::config::BufferConfig;
use crate::error::{BufferError, Result};
use crate::fold::FoldHandler;
use crate::listener::{BufferListener, ListenerPriority, ListenerRegistry, Listeners};
use crate::position::{Position, PositionTracker};
use crate::state::DocumentState;
use crate::tokenizer::{Token, Tokenizer};
use crate::types::{BufferPhase, ContentChange, UndoId};
use crate::undo::{KillRing, ReplayOp};

/// Decoded text plus its line table, as produced by a file loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedText {
    chars: Vec<char>,
    line_ends: Vec<usize>,
}

impl LoadedText {
    /// Wraps text whose line table was computed elsewhere.
    ///
    /// `line_ends` must hold, in increasing order, the offset just past
    /// every `'\n'` in `chars`, and nothing else.
    pub fn new(chars: Vec<char>, line_ends: Vec<usize>) -> Result<Self> {
        let mut prev = 0;
        for (index, &end) in line_ends.iter().enumerate() {
            if end <= prev && index > 0 {
                return Err(BufferError::InvalidLineTable {
                    index,
                    reason: "offsets must strictly increase",
                });
            }
            if end == 0 || end > chars.len() {
                return Err(BufferError::InvalidLineTable {
                    index,
                    reason: "offset outside the text",
                });
            }
            if chars[end - 1] != '\n' {
                return Err(BufferError::InvalidLineTable {
                    index,
                    reason: "offset does not follow a line terminator",
                });
            }
            prev = end;
        }
        let newlines = chars.iter().filter(|&&ch| ch == '\n').count();
        if newlines != line_ends.len() {
            return Err(BufferError::InvalidLineTable {
                index: line_ends.len(),
                reason: "table does not list every line terminator",
            });
        }
        Ok(Self { chars, line_ends })
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

impl From<&str> for LoadedText {
    fn from(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let line_ends = chars
            .iter()
            .enumerate()
            .filter(|(_, ch)| **ch == '\n')
            .map(|(i, _)| i + 1)
            .collect();
        Self { chars, line_ends }
    }
}

impl From<String> for LoadedText {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}

/// An editable document shared between one mutating thread and any number
/// of readers.
pub struct DocumentBuffer {
    state: RwLock<DocumentState>,
    positions: PositionTracker,
    listeners: Mutex<ListenerRegistry>,
}

impl DocumentBuffer {
    /// Creates an empty, ready-to-edit document with default settings.
    pub fn new() -> Self {
        Self::with_config(BufferConfig::default())
    }

    pub fn with_config(config: BufferConfig) -> Self {
        let mut state = DocumentState::new(&config);
        state.phase = BufferPhase::Ready;
        Self {
            state: RwLock::new(state),
            positions: PositionTracker::new(),
            listeners: Mutex::new(ListenerRegistry::default()),
        }
    }

    /// Creates a document holding `text`, with empty history and a clean
    /// dirty flag.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Self {
        let buffer = Self::new();
        buffer.load(LoadedText::from(text));
        buffer
    }

    // ==================== Locking ====================

    /// Takes the read lock for a consistent multi-query snapshot.
    ///
    /// Holding the guard blocks mutations; keep it short.
    pub fn read(&self) -> impl Deref<Target = DocumentState> + '_ {
        self.state.read()
    }

    fn snapshot_listeners(&self) -> Listeners {
        self.listeners.lock().snapshot()
    }

    // ==================== Single-call queries ====================

    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }

    pub fn text(&self) -> String {
        self.state.read().text()
    }

    pub fn get_text(&self, start: usize, len: usize) -> Result<String> {
        self.state.read().get_text(start, len)
    }

    pub fn line_count(&self) -> usize {
        self.state.read().line_count()
    }

    pub fn line_of_offset(&self, offset: usize) -> Result<usize> {
        self.state.read().line_of_offset(offset)
    }

    pub fn line_start_offset(&self, line: usize) -> Result<usize> {
        self.state.read().line_start_offset(line)
    }

    pub fn line_end_offset(&self, line: usize) -> Result<usize> {
        self.state.read().line_end_offset(line)
    }

    pub fn line_text(&self, line: usize) -> Result<String> {
        self.state.read().line_text(line)
    }

    pub fn is_dirty(&self) -> bool {
        self.state.read().is_dirty()
    }

    pub fn is_editable(&self) -> bool {
        self.state.read().is_editable()
    }

    pub fn is_read_only(&self) -> bool {
        self.state.read().is_read_only()
    }

    pub fn phase(&self) -> BufferPhase {
        self.state.read().phase()
    }

    pub fn can_undo(&self) -> bool {
        self.state.read().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.state.read().can_redo()
    }

    pub fn undo_id(&self) -> UndoId {
        self.state.read().undo_id()
    }

    // ==================== Mutations ====================

    /// Inserts `text` at `offset`.
    ///
    /// Inserting an empty string does nothing, even on a read-only document.
    pub fn insert(&self, offset: usize, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.is_editable() {
            return Err(BufferError::ReadOnly);
        }
        state.check_range(offset, 0)?;

        let listeners = self.snapshot_listeners();
        self.insert_locked(state, &listeners, offset, text);
        if !state.undo.in_compound() {
            listeners.fire("transaction_complete", |l| l.transaction_complete(state));
        }
        Ok(())
    }

    /// Removes `len` chars starting at `offset`.
    pub fn remove(&self, offset: usize, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.is_editable() {
            return Err(BufferError::ReadOnly);
        }
        state.check_range(offset, len)?;

        let listeners = self.snapshot_listeners();
        self.remove_locked(state, &listeners, offset, len);
        if !state.undo.in_compound() {
            listeners.fire("transaction_complete", |l| l.transaction_complete(state));
        }
        Ok(())
    }

    /// Replaces `len` chars at `offset` with `text` as one undoable edit.
    pub fn replace(&self, offset: usize, len: usize, text: &str) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.is_editable() {
            return Err(BufferError::ReadOnly);
        }
        state.check_range(offset, len)?;
        if len == 0 && text.is_empty() {
            return Ok(());
        }

        let listeners = self.snapshot_listeners();
        state.undo.begin_compound();
        if len > 0 {
            self.remove_locked(state, &listeners, offset, len);
        }
        if !text.is_empty() {
            self.insert_locked(state, &listeners, offset, text);
        }
        state.undo.end_compound();
        if !state.undo.in_compound() {
            listeners.fire("transaction_complete", |l| l.transaction_complete(state));
        }
        Ok(())
    }

    fn insert_locked(
        &self,
        state: &mut DocumentState,
        listeners: &Listeners,
        offset: usize,
        text: &str,
    ) {
        debug_assert!(offset <= state.len(), "insert at {offset} past end {}", state.len());

        let chars: Vec<char> = text.chars().collect();
        let length = chars.len();
        let line_ends: Vec<usize> = chars
            .iter()
            .enumerate()
            .filter(|(_, ch)| **ch == '\n')
            .map(|(i, _)| i + 1)
            .collect();
        let replaying = state.phase == BufferPhase::UndoInProgress;
        let clears_dirty = !state.dirty;
        let undo_id = if replaying {
            state.undo.undo_id()
        } else {
            state.undo.prepare_insert(offset, clears_dirty)
        };
        let change = ContentChange {
            start_line: state.lines.line_of_offset(offset),
            offset,
            num_lines: line_ends.len(),
            length,
            undo_id,
        };

        let next_phase = if replaying {
            BufferPhase::UndoInProgress
        } else {
            BufferPhase::Inserting
        };
        let prev_phase = mem::replace(&mut state.phase, next_phase);

        listeners.fire("pre_content_inserted", |l| l.pre_content_inserted(state, &change));

        state.store.insert(offset, &chars);
        state
            .lines
            .on_content_inserted(change.start_line, offset, change.num_lines, length, &line_ends);
        self.positions.content_inserted(offset, length);
        if !replaying {
            state.undo.record_insert(offset, length, text, clears_dirty);
        }
        state.dirty = true;
        state.assert_line_index_consistent();

        tracing::trace!(offset, length, lines = change.num_lines, "content inserted");
        listeners.fire("content_inserted", |l| l.content_inserted(state, &change));

        state.phase = prev_phase;
    }

    fn remove_locked(
        &self,
        state: &mut DocumentState,
        listeners: &Listeners,
        offset: usize,
        length: usize,
    ) {
        debug_assert!(offset + length <= state.len(), "remove {offset}+{length} past end");

        let text = state.store.get_text(offset, length);
        let replaying = state.phase == BufferPhase::UndoInProgress;
        let clears_dirty = !state.dirty;
        let undo_id = if replaying {
            state.undo.undo_id()
        } else {
            state.undo.prepare_remove(offset, length, clears_dirty)
        };
        let change = ContentChange {
            start_line: state.lines.line_of_offset(offset),
            offset,
            num_lines: text.matches('\n').count(),
            length,
            undo_id,
        };

        let next_phase = if replaying {
            BufferPhase::UndoInProgress
        } else {
            BufferPhase::Removing
        };
        let prev_phase = mem::replace(&mut state.phase, next_phase);

        listeners.fire("pre_content_removed", |l| l.pre_content_removed(state, &change));

        state.store.remove(offset, length);
        state
            .lines
            .on_content_removed(change.start_line, offset, change.num_lines, length);
        self.positions.content_removed(offset, length);
        if !replaying {
            state.undo.record_remove(offset, length, &text, clears_dirty);
        }
        state.dirty = true;
        state.assert_line_index_consistent();

        tracing::trace!(offset, length, lines = change.num_lines, "content removed");
        listeners.fire("content_removed", |l| l.content_removed(state, &change));

        state.phase = prev_phase;
    }

    // ==================== Compound edits ====================

    /// Opens a compound edit. Nestable; only the outermost
    /// [`end_compound`](Self::end_compound) commits a history entry.
    pub fn begin_compound(&self) {
        self.state.write().undo.begin_compound();
    }

    /// Closes a compound edit. An unmatched call is logged and ignored.
    pub fn end_compound(&self) {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if state.undo.end_compound() && !state.undo.in_compound() {
            self.snapshot_listeners()
                .fire("transaction_complete", |l| l.transaction_complete(state));
        }
    }

    /// Opens a compound edit that closes when the guard is dropped.
    pub fn compound_edit(&self) -> CompoundEdit<'_> {
        self.begin_compound();
        CompoundEdit { buffer: self }
    }

    // ==================== Undo ====================

    /// Reverts the most recent history entry.
    ///
    /// Returns the caret offset after the undo, or `None` if there was
    /// nothing to undo. Fails while a compound edit is open.
    pub fn undo(&self) -> Result<Option<usize>> {
        self.replay(true)
    }

    /// Reapplies the most recently undone entry.
    pub fn redo(&self) -> Result<Option<usize>> {
        self.replay(false)
    }

    fn replay(&self, undo: bool) -> Result<Option<usize>> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.is_editable() {
            return Err(BufferError::ReadOnly);
        }
        let plan = if undo {
            state.undo.undo()?
        } else {
            state.undo.redo()?
        };
        let Some(plan) = plan else {
            return Ok(None);
        };

        let listeners = self.snapshot_listeners();
        let prev_phase = mem::replace(&mut state.phase, BufferPhase::UndoInProgress);
        if undo {
            listeners.fire("begin_undo", |l| l.begin_undo(state));
        } else {
            listeners.fire("begin_redo", |l| l.begin_redo(state));
        }

        for step in plan.steps {
            match step.op {
                ReplayOp::Insert { offset, text } => {
                    self.insert_locked(state, &listeners, offset, &text)
                }
                ReplayOp::Remove { offset, len } => {
                    self.remove_locked(state, &listeners, offset, len)
                }
            }
            if step.clears_dirty {
                state.dirty = false;
            }
        }

        if undo {
            listeners.fire("end_undo", |l| l.end_undo(state));
        } else {
            listeners.fire("end_redo", |l| l.end_redo(state));
        }
        state.phase = prev_phase;
        listeners.fire("transaction_complete", |l| l.transaction_complete(state));

        tracing::debug!(undo, caret = plan.caret, "history replayed");
        Ok(Some(plan.caret))
    }

    /// Drops every history entry.
    pub fn clear_history(&self) {
        self.state.write().undo.clear();
    }

    pub fn set_undo_limit(&self, limit: usize) {
        tracing::debug!(limit, "undo limit changed");
        self.state.write().undo.set_limit(limit);
    }

    pub fn set_kill_ring(&self, kill_ring: Option<Arc<dyn KillRing>>) {
        self.state.write().undo.set_kill_ring(kill_ring);
    }

    // ==================== Status ====================

    /// Records that the current content was saved.
    pub fn mark_saved(&self) {
        self.set_dirty(false);
    }

    /// Sets the dirty flag. Clearing it also moves the undo save point to
    /// the current history position.
    pub fn set_dirty(&self, dirty: bool) {
        let mut state = self.state.write();
        if !dirty {
            state.undo.reset_clear_dirty();
        }
        state.dirty = dirty;
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.state.write().read_only = read_only;
    }

    /// Marks a load or save as in flight; the document is not editable
    /// until it is cleared.
    pub fn set_performing_io(&self, performing_io: bool) {
        self.state.write().performing_io = performing_io;
    }

    // ==================== Bulk load ====================

    /// Replaces the whole content with `loaded`, bypassing the incremental
    /// edit path.
    ///
    /// Listeners see the old content removed and the new content inserted,
    /// then `buffer_loaded`. History is cleared and the document is clean.
    /// Editability is not checked; loaders set `performing_io` themselves.
    pub fn load(&self, loaded: LoadedText) {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let listeners = self.snapshot_listeners();
        let prev_phase = mem::replace(&mut state.phase, BufferPhase::Loading);

        let old_len = state.len();
        if old_len > 0 {
            let change = ContentChange {
                start_line: 0,
                offset: 0,
                num_lines: state.line_count() - 1,
                length: old_len,
                undo_id: state.undo.undo_id(),
            };
            listeners.fire("pre_content_removed", |l| l.pre_content_removed(state, &change));
            state.store.set_content(Vec::new());
            state.lines.reset(&[], 0);
            self.positions.content_removed(0, old_len);
            listeners.fire("content_removed", |l| l.content_removed(state, &change));
        }

        let length = loaded.chars.len();
        let change = ContentChange {
            start_line: 0,
            offset: 0,
            num_lines: loaded.line_ends.len(),
            length,
            undo_id: state.undo.undo_id(),
        };
        listeners.fire("pre_content_inserted", |l| l.pre_content_inserted(state, &change));
        state.lines.reset(&loaded.line_ends, length);
        state.store.set_content(loaded.chars);
        self.positions.content_inserted(0, length);
        listeners.fire("content_inserted", |l| l.content_inserted(state, &change));

        state.undo.clear();
        state.dirty = false;
        state.phase = if prev_phase == BufferPhase::Loading {
            BufferPhase::Ready
        } else {
            prev_phase
        };
        tracing::debug!(len = length, lines = change.num_lines + 1, "document loaded");
        listeners.fire("buffer_loaded", |l| l.buffer_loaded(state));
    }

    // ==================== Positions ====================

    /// Creates a floating position at `offset`.
    pub fn create_position(&self, offset: usize) -> Result<Position> {
        let state = self.state.read();
        state.check_range(offset, 0)?;
        Ok(self.positions.create(offset))
    }

    /// Tracker behind [`create_position`](Self::create_position), for
    /// diagnostics.
    pub fn positions(&self) -> &PositionTracker {
        &self.positions
    }

    // ==================== Listeners ====================

    pub fn add_listener(&self, listener: Arc<dyn BufferListener>, priority: ListenerPriority) {
        self.listeners.lock().add(listener, priority);
    }

    /// Removes a listener by identity. Returns false if it was not registered.
    pub fn remove_listener(&self, listener: &Arc<dyn BufferListener>) -> bool {
        self.listeners.lock().remove(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    // ==================== Folding ====================

    /// Installs a fold handler and invalidates every cached fold level.
    pub fn set_fold_handler(&self, handler: Arc<dyn FoldHandler>) {
        let mut guard = self.state.write();
        let state = &mut *guard;
        tracing::debug!(handler = handler.name(), "fold handler changed");
        state.fold_handler = handler;
        state.lines.invalidate_fold_levels_from(0);
        self.snapshot_listeners()
            .fire("fold_handler_changed", |l| l.fold_handler_changed(state));
    }

    /// Marks every cached fold level stale.
    pub fn invalidate_fold_levels(&self) {
        self.state.write().lines.invalidate_fold_levels_from(0);
    }

    /// Changes the tab width. Indentation-based fold levels depend on it,
    /// so they are invalidated.
    pub fn set_tab_size(&self, tab_size: usize) {
        let mut state = self.state.write();
        state.tab_size = tab_size;
        state.lines.invalidate_fold_levels_from(0);
    }

    /// Fold level of `line`, computing stale levels up to it on demand.
    ///
    /// Already-current levels are served under the read lock.
    pub fn fold_level(&self, line: usize) -> Result<u32> {
        let guard = self.state.upgradable_read();
        guard.check_line(line)?;
        if let Some(level) = guard.lines.valid_fold_level(line) {
            return Ok(level);
        }

        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        let state = &mut *guard;
        let refresh = state.refresh_fold_level(line);
        if let Some((start, end)) = refresh.changed {
            self.snapshot_listeners()
                .fire("fold_level_changed", |l| l.fold_level_changed(state, start, end));
        }
        Ok(refresh.level)
    }

    /// True if `line` opens a fold: the next line is nested deeper.
    pub fn is_fold_start(&self, line: usize) -> Result<bool> {
        self.with_folds(line, |folds, line| {
            Ok(line + 1 != folds.line_count() && folds.level(line) < folds.level(line + 1))
        })
    }

    /// True if `line` closes a fold: the next line is nested shallower.
    pub fn is_fold_end(&self, line: usize) -> Result<bool> {
        self.with_folds(line, |folds, line| {
            Ok(line + 1 != folds.line_count() && folds.level(line) > folds.level(line + 1))
        })
    }

    /// Line range `(start, end)` of the innermost fold containing `line`,
    /// or starting at it. Trailing empty lines are not part of the fold.
    pub fn fold_at_line(&self, line: usize) -> Result<(usize, usize)> {
        self.with_folds(line, |folds, line| {
            let line_count = folds.line_count();
            let start;
            let mut end;
            if line + 1 != line_count && folds.level(line) < folds.level(line + 1) {
                start = line;
                let level = folds.level(line);
                end = line + 1;
                while end < line_count && folds.level(end) > level {
                    end += 1;
                }
                end -= 1;
            } else {
                let level = folds.level(line);
                let mut first = line;
                while first > 0 && folds.level(first) >= level {
                    first -= 1;
                }
                start = first;
                end = line;
                while end < line_count && folds.level(end) >= level {
                    end += 1;
                }
                end -= 1;
            }
            while end > start && folds.state.line_length(end)? == 0 {
                end -= 1;
            }
            Ok((start, end))
        })
    }

    /// Runs a fold query under the write lock and reports every fold level
    /// change it caused as one range.
    fn with_folds<T>(
        &self,
        line: usize,
        query: impl FnOnce(&mut FoldQuery<'_>, usize) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.check_line(line)?;
        let mut folds = FoldQuery {
            state,
            changed: None,
        };
        let result = query(&mut folds, line);
        let FoldQuery { state, changed } = folds;
        if let Some((start, end)) = changed {
            self.snapshot_listeners()
                .fire("fold_level_changed", |l| l.fold_level_changed(state, start, end));
        }
        result
    }

    // ==================== Tokenizing ====================

    /// Installs (or removes) the tokenizer and invalidates every cached
    /// line context.
    pub fn set_tokenizer(&self, tokenizer: Option<Arc<dyn Tokenizer>>) {
        let mut state = self.state.write();
        state.tokenizer = tokenizer;
        state.lines.invalidate_tokenizer_from(0);
    }

    /// Tokens of `line`, bringing the tokenizer state of earlier lines up
    /// to date first. Empty when no tokenizer is installed.
    pub fn mark_tokens(&self, line: usize) -> Result<Vec<Token>> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.check_line(line)?;
        let Some(tokenizer) = state.tokenizer.clone() else {
            return Ok(Vec::new());
        };
        Ok(state
            .lines
            .refresh_line_contexts(line, &state.store, tokenizer.as_ref()))
    }
}

impl Default for DocumentBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DocumentBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentBuffer")
            .field("state", &*self.state.read())
            .field("positions", &self.positions.len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Write-locked view used by the fold queries.
struct FoldQuery<'a> {
    state: &'a mut DocumentState,
    changed: Option<(usize, usize)>,
}

impl FoldQuery<'_> {
    fn line_count(&self) -> usize {
        self.state.line_count()
    }

    fn level(&mut self, line: usize) -> u32 {
        let refresh = self.state.refresh_fold_level(line);
        if let Some((start, end)) = refresh.changed {
            self.changed = Some(match self.changed {
                Some((s, e)) => (s.min(start), e.max(end)),
                None => (start, end),
            });
        }
        refresh.level
    }
}

/// Guard returned by [`DocumentBuffer::compound_edit`].
///
/// Edits made while it is alive undo as one step.
#[must_use = "the compound edit ends when the guard is dropped"]
pub struct CompoundEdit<'a> {
    buffer: &'a DocumentBuffer,
}

impl CompoundEdit<'_> {
    pub fn buffer(&self) -> &DocumentBuffer {
        self.buffer
    }
}

impl Drop for CompoundEdit<'_> {
    fn drop(&mut self) {
        self.buffer.end_compound();
    }
}
