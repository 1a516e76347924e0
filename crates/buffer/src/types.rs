// Chunk: docs/chunks/document_buffer - Document facade, listeners and locking

//! Small value types shared between the document components.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_UNDO_ID: AtomicU64 = AtomicU64::new(1);

/// Identity token for one logical, undo-distinguishable operation.
///
/// A fresh id is minted when a compound edit begins, when a standalone edit
/// starts a new history entry, and on every undo/redo. Several content
/// notifications carrying the same id belong to the same logical edit.
/// Ids are unique for the life of the process; only equality is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UndoId(u64);

impl UndoId {
    pub(crate) fn mint() -> Self {
        Self(NEXT_UNDO_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Describes one insertion or removal, as delivered to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentChange {
    /// Line containing `offset`, measured before the change.
    pub start_line: usize,
    /// Offset of the first inserted/removed character.
    pub offset: usize,
    /// Number of line terminators inserted or removed.
    pub num_lines: usize,
    /// Number of characters inserted or removed.
    pub length: usize,
    /// Logical edit this change belongs to.
    pub undo_id: UndoId,
}

impl ContentChange {
    /// Last line touched by the change (inclusive).
    pub fn end_line(&self) -> usize {
        self.start_line + self.num_lines
    }
}

/// Lifecycle of a document.
///
/// `Loading -> Ready`, then `Ready` alternates with one in-flight mutation at
/// a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferPhase {
    /// Bulk content is being installed and the document is not editable.
    #[default]
    Loading,
    /// No mutation in flight.
    Ready,
    Inserting,
    Removing,
    /// An undo or redo is replaying history.
    UndoInProgress,
}

impl BufferPhase {
    /// Returns true while a mutation is running.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            BufferPhase::Inserting | BufferPhase::Removing | BufferPhase::UndoInProgress
        )
    }
}
