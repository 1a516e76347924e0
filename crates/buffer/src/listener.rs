// Chunk: docs/chunks/buffer_listeners - Change notification registry

//! Change notifications.
//!
//! Listeners run synchronously on the mutating thread while the document
//! write lock is held, and see the document through `&DocumentState`. They
//! must not call back into the mutating [`DocumentBuffer`] API: the lock is
//! not reentrant and such a call deadlocks.
//!
//! [`DocumentBuffer`]: crate::DocumentBuffer

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::state::DocumentState;
use crate::types::ContentChange;

/// Observer of document changes. Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait BufferListener: Send + Sync {
    /// Before text is inserted. `change.undo_id` is the id current before
    /// the edit is recorded.
    fn pre_content_inserted(&self, doc: &DocumentState, change: &ContentChange) {}

    /// After text was inserted and every index updated.
    fn content_inserted(&self, doc: &DocumentState, change: &ContentChange) {}

    /// Before text is removed; the text is still readable through `doc`.
    fn pre_content_removed(&self, doc: &DocumentState, change: &ContentChange) {}

    fn content_removed(&self, doc: &DocumentState, change: &ContentChange) {}

    /// Cached fold levels of `start_line..=end_line` changed.
    fn fold_level_changed(&self, doc: &DocumentState, start_line: usize, end_line: usize) {}

    fn fold_handler_changed(&self, doc: &DocumentState) {}

    /// A complete logical edit finished: a standalone insert/remove, the
    /// outermost compound edit, or an undo/redo.
    fn transaction_complete(&self, doc: &DocumentState) {}

    /// A bulk load finished.
    fn buffer_loaded(&self, doc: &DocumentState) {}

    fn begin_undo(&self, doc: &DocumentState) {}
    fn end_undo(&self, doc: &DocumentState) {}
    fn begin_redo(&self, doc: &DocumentState) {}
    fn end_redo(&self, doc: &DocumentState) {}
}

/// Delivery bucket. High-priority listeners see every event first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ListenerPriority {
    High,
    #[default]
    Normal,
}

type Entry = (ListenerPriority, Arc<dyn BufferListener>);

/// Registered listeners in delivery order.
///
/// Firing works on a snapshot, so registration changes never race an
/// in-progress delivery.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    entries: Arc<Vec<Entry>>,
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, listener: Arc<dyn BufferListener>, priority: ListenerPriority) {
        let mut entries = Vec::clone(&self.entries);
        // Stable: keep registration order within a bucket
        let idx = entries.partition_point(|(p, _)| *p <= priority);
        entries.insert(idx, (priority, listener));
        self.entries = Arc::new(entries);
    }

    /// Removes `listener`. Returns false if it was not registered.
    pub(crate) fn remove(&mut self, listener: &Arc<dyn BufferListener>) -> bool {
        let target = Arc::as_ptr(listener) as *const ();
        let Some(idx) = self
            .entries
            .iter()
            .position(|(_, l)| Arc::as_ptr(l) as *const () == target)
        else {
            return false;
        };
        let mut entries = Vec::clone(&self.entries);
        entries.remove(idx);
        self.entries = Arc::new(entries);
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn snapshot(&self) -> Listeners {
        Listeners(Arc::clone(&self.entries))
    }
}

/// A point-in-time copy of the registry used for one delivery.
pub(crate) struct Listeners(Arc<Vec<Entry>>);

impl Listeners {
    /// Calls `f` on every listener in order. A panicking listener is logged
    /// and skipped; the rest still run.
    pub(crate) fn fire(&self, event: &'static str, f: impl Fn(&dyn BufferListener)) {
        for (priority, listener) in self.0.iter() {
            let result = catch_unwind(AssertUnwindSafe(|| f(listener.as_ref())));
            if let Err(payload) = result {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                tracing::error!(event, ?priority, panic = %message, "buffer listener panicked");
            }
        }
    }
}
