// Chunk: docs/chunks/document_buffer - Document facade, listeners and locking

//! Everything the document read/write lock protects.
//!
//! Readers get a `&DocumentState` through [`DocumentBuffer::read`] and
//! listeners receive one with every notification. Every query here is
//! bounds-checked and side-effect free; lazily cached data (fold levels,
//! tokenizer contexts) is only reported when it is already current.
//!
//! [`DocumentBuffer::read`]: crate::DocumentBuffer::read

use std::fmt;
use std::sync::Arc;

use crate::config::BufferConfig;
use crate::error::{BufferError, Result};
use crate::fold::{FoldHandler, NoFoldHandler};
use crate::gap_buffer::{GapTextStore, TextSegment};
use crate::line_index::{FoldRefresh, LineIndex};
use crate::tokenizer::Tokenizer;
use crate::types::{BufferPhase, UndoId};
use crate::undo::UndoEngine;

pub struct DocumentState {
    pub(crate) store: GapTextStore,
    pub(crate) lines: LineIndex,
    pub(crate) undo: UndoEngine,
    pub(crate) fold_handler: Arc<dyn FoldHandler>,
    pub(crate) tokenizer: Option<Arc<dyn Tokenizer>>,
    pub(crate) tab_size: usize,
    pub(crate) phase: BufferPhase,
    pub(crate) dirty: bool,
    pub(crate) read_only: bool,
    pub(crate) performing_io: bool,
    /// Mutation counter for sampling debug assertions (debug builds only).
    #[cfg(debug_assertions)]
    debug_mutation_count: u64,
}

impl DocumentState {
    pub(crate) fn new(config: &BufferConfig) -> Self {
        Self {
            store: GapTextStore::with_gap(config.initial_gap),
            lines: LineIndex::new(),
            undo: UndoEngine::new(config.undo_limit),
            fold_handler: Arc::new(NoFoldHandler),
            tokenizer: None,
            tab_size: config.tab_size,
            phase: BufferPhase::Loading,
            dirty: false,
            read_only: config.read_only,
            performing_io: false,
            #[cfg(debug_assertions)]
            debug_mutation_count: 0,
        }
    }

    // ==================== Text ====================

    /// Number of characters in the document.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The whole document as a string.
    pub fn text(&self) -> String {
        self.store.to_string()
    }

    pub fn get_text(&self, start: usize, len: usize) -> Result<String> {
        self.check_range(start, len)?;
        Ok(self.store.get_text(start, len))
    }

    /// Zero-copy view of `start..start + len`, in two parts if the range
    /// straddles the store's gap.
    pub fn segment(&self, start: usize, len: usize) -> Result<TextSegment<'_>> {
        self.check_range(start, len)?;
        Ok(self.store.segment(start, len))
    }

    pub fn char_at(&self, offset: usize) -> Result<char> {
        self.store
            .char_at(offset)
            .ok_or(BufferError::OutOfBounds {
                offset,
                length: 1,
                len: self.len(),
            })
    }

    // ==================== Lines ====================

    /// Number of lines. A trailing newline starts a final, empty line.
    pub fn line_count(&self) -> usize {
        self.lines.line_count()
    }

    /// Line containing `offset`; `offset == len()` is the last line.
    pub fn line_of_offset(&self, offset: usize) -> Result<usize> {
        self.check_range(offset, 0)?;
        Ok(self.lines.line_of_offset(offset))
    }

    pub fn line_start_offset(&self, line: usize) -> Result<usize> {
        self.check_line(line)?;
        Ok(self.lines.line_start_offset(line))
    }

    /// Offset just past the line's terminator. For the last line, which has
    /// none, this is `len() + 1`.
    pub fn line_end_offset(&self, line: usize) -> Result<usize> {
        self.check_line(line)?;
        Ok(self.lines.line_end_offset(line))
    }

    /// Length of `line` in chars, excluding its terminator.
    pub fn line_length(&self, line: usize) -> Result<usize> {
        self.check_line(line)?;
        Ok(self.lines.line_end_offset(line) - self.lines.line_start_offset(line) - 1)
    }

    /// Text of `line` without its terminator.
    pub fn line_text(&self, line: usize) -> Result<String> {
        let start = self.line_start_offset(line)?;
        let len = self.line_length(line)?;
        Ok(self.store.get_text(start, len))
    }

    // ==================== Status ====================

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Not read-only and no I/O in flight.
    pub fn is_editable(&self) -> bool {
        !self.read_only && !self.performing_io
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_performing_io(&self) -> bool {
        self.performing_io
    }

    pub fn phase(&self) -> BufferPhase {
        self.phase
    }

    pub fn tab_size(&self) -> usize {
        self.tab_size
    }

    // ==================== History ====================

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn undo_id(&self) -> UndoId {
        self.undo.undo_id()
    }

    pub fn in_compound_edit(&self) -> bool {
        self.undo.in_compound()
    }

    pub fn undo_limit(&self) -> usize {
        self.undo.limit()
    }

    // ==================== Derived line state ====================

    /// Fold level of `line` if the cached value is current, `None` if it
    /// still has to be computed.
    pub fn fold_level_if_valid(&self, line: usize) -> Result<Option<u32>> {
        self.check_line(line)?;
        Ok(self.lines.valid_fold_level(line))
    }

    pub fn fold_handler_name(&self) -> &str {
        self.fold_handler.name()
    }

    // ==================== Internal ====================

    pub(crate) fn check_range(&self, offset: usize, length: usize) -> Result<()> {
        let len = self.len();
        match offset.checked_add(length) {
            Some(end) if end <= len => Ok(()),
            _ => Err(BufferError::OutOfBounds {
                offset,
                length,
                len,
            }),
        }
    }

    pub(crate) fn check_line(&self, line: usize) -> Result<()> {
        let line_count = self.line_count();
        if line < line_count {
            Ok(())
        } else {
            Err(BufferError::LineOutOfBounds { line, line_count })
        }
    }

    /// Brings fold levels up to date through `line`.
    pub(crate) fn refresh_fold_level(&mut self, line: usize) -> FoldRefresh {
        let handler = Arc::clone(&self.fold_handler);
        self.lines
            .refresh_fold_levels(line, &self.store, handler.as_ref(), self.tab_size)
    }

    /// Verifies the line index against a full rescan of the text.
    ///
    /// Uses a mutation counter so the O(n) rebuild doesn't tank perf
    /// in tight loops; checks every 64th mutation.
    #[cfg(debug_assertions)]
    pub(crate) fn assert_line_index_consistent(&mut self) {
        self.debug_mutation_count += 1;
        if self.debug_mutation_count % 64 != 0 {
            return;
        }
        let mut expected = LineIndex::new();
        expected.rebuild(self.store.chars());
        let actual = self.lines.line_ends();
        let expected_ends = expected.line_ends();
        assert_eq!(
            actual, expected_ends,
            "line index drift detected after {} mutations!\n  document len: {}\n  actual line ends:   {:?}\n  expected line ends: {:?}",
            self.debug_mutation_count, self.store.len(), actual, expected_ends,
        );
    }

    #[cfg(not(debug_assertions))]
    pub(crate) fn assert_line_index_consistent(&mut self) {}
}

impl fmt::Debug for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentState")
            .field("len", &self.len())
            .field("line_count", &self.line_count())
            .field("phase", &self.phase)
            .field("dirty", &self.dirty)
            .field("read_only", &self.read_only)
            .field("performing_io", &self.performing_io)
            .field("fold_handler", &self.fold_handler.name())
            .field("undo", &self.undo)
            .finish_non_exhaustive()
    }
}
