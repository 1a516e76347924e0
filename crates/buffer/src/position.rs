// Chunk: docs/chunks/floating_positions - Reference-counted floating offsets

//! Floating positions: offsets that follow the text they point at.
//!
//! Records live in a slab and are kept ordered by offset through a sorted id
//! vector, so an edit only walks the records at or after the edit point.
//! Two positions created at the same offset share one record. A [`Position`]
//! handle is a counted reference to a record; the record disappears when the
//! last handle is dropped.
//!
//! The tracker has its own lock. It is only ever taken while the document
//! lock is already held (edits) or with no document lock at all (handles
//! dropped on arbitrary threads), never the other way round.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use slab::Slab;

#[derive(Debug)]
struct PositionRecord {
    offset: usize,
    refs: usize,
}

#[derive(Debug, Default)]
struct PositionSet {
    records: Slab<PositionRecord>,
    /// Record ids sorted by offset.
    order: Vec<usize>,
}

impl PositionSet {
    /// Index in `order` of the first record with offset >= `offset`.
    fn lower_bound(&self, offset: usize) -> usize {
        self.order
            .partition_point(|&id| self.records[id].offset < offset)
    }

    fn acquire(&mut self, offset: usize) -> usize {
        let idx = self.lower_bound(offset);
        if let Some(&id) = self.order.get(idx) {
            let record = &mut self.records[id];
            if record.offset == offset {
                record.refs += 1;
                return id;
            }
        }
        let id = self.records.insert(PositionRecord { offset, refs: 1 });
        self.order.insert(idx, id);
        id
    }

    fn release(&mut self, id: usize) {
        let record = &mut self.records[id];
        debug_assert!(record.refs > 0, "position {id} released too often");
        record.refs -= 1;
        if record.refs > 0 {
            return;
        }

        // Collapsed records can share an offset, so scan the equal run.
        let offset = record.offset;
        let start = self.lower_bound(offset);
        if let Some(idx) = self.order[start..].iter().position(|&other| other == id) {
            self.order.remove(start + idx);
        } else {
            debug_assert!(false, "position {id} missing from the ordered set");
        }
        self.records.remove(id);
    }

    fn shift_for_insert(&mut self, offset: usize, length: usize) {
        let start = self.lower_bound(offset);
        for &id in &self.order[start..] {
            self.records[id].offset += length;
        }
    }

    fn shift_for_remove(&mut self, offset: usize, length: usize) {
        let start = self.lower_bound(offset);
        let removed_end = offset + length;
        for &id in &self.order[start..] {
            let record = &mut self.records[id];
            record.offset = if record.offset < removed_end {
                offset
            } else {
                record.offset - length
            };
        }
    }
}

/// Owns every floating position of one document.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    set: Arc<Mutex<PositionSet>>,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the position at `offset`, sharing an existing
    /// record at the same offset if there is one.
    ///
    /// The caller validates `offset` against the document length.
    pub fn create(&self, offset: usize) -> Position {
        let id = self.set.lock().acquire(offset);
        Position {
            set: Arc::clone(&self.set),
            id,
        }
    }

    /// Moves positions at or after `offset` forward by `length`.
    pub fn content_inserted(&self, offset: usize, length: usize) {
        if length == 0 {
            return;
        }
        self.set.lock().shift_for_insert(offset, length);
    }

    /// Collapses positions inside the removed span onto `offset` and moves
    /// positions after it back by `length`.
    pub fn content_removed(&self, offset: usize, length: usize) {
        if length == 0 {
            return;
        }
        self.set.lock().shift_for_remove(offset, length);
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.set.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total handle count across records currently at `offset`.
    pub fn ref_count_at(&self, offset: usize) -> usize {
        let set = self.set.lock();
        let start = set.lower_bound(offset);
        set.order[start..]
            .iter()
            .map(|&id| &set.records[id])
            .take_while(|record| record.offset == offset)
            .map(|record| record.refs)
            .sum()
    }

    /// Offsets of every live record, in order.
    pub fn offsets(&self) -> Vec<usize> {
        let set = self.set.lock();
        set.order.iter().map(|&id| set.records[id].offset).collect()
    }
}

/// Handle to a floating position.
///
/// Cloning adds a reference to the same record; dropping the last handle
/// releases it. Handles may be dropped on any thread.
pub struct Position {
    set: Arc<Mutex<PositionSet>>,
    id: usize,
}

impl Position {
    /// Current offset of the position.
    pub fn offset(&self) -> usize {
        self.set.lock().records[self.id].offset
    }

    /// Releases this handle. Same as dropping it.
    pub fn release(self) {
        drop(self);
    }

    /// Returns true if both handles reference the same record.
    pub fn shares_record(&self, other: &Position) -> bool {
        Arc::ptr_eq(&self.set, &other.set) && self.id == other.id
    }
}

impl Clone for Position {
    fn clone(&self) -> Self {
        self.set.lock().records[self.id].refs += 1;
        Self {
            set: Arc::clone(&self.set),
            id: self.id,
        }
    }
}

impl Drop for Position {
    fn drop(&mut self) {
        self.set.lock().release(self.id);
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("offset", &self.offset())
            .finish()
    }
}
