// Chunk: docs/chunks/buffer_config - Serializable buffer configuration

//! Per-document configuration.
//!
//! The struct deserializes with every field optional, so a host can persist
//! only the settings it overrides (the same way workspace sessions are stored
//! as partial JSON).

use serde::{Deserialize, Serialize};

/// Default number of undo history entries kept.
pub const DEFAULT_UNDO_LIMIT: usize = 100;
/// Default tab width used by indent-based folding.
pub const DEFAULT_TAB_SIZE: usize = 8;
/// Default gap reserved by a fresh text store.
pub const DEFAULT_INITIAL_GAP: usize = 64;

/// Construction-time settings for a [`DocumentBuffer`](crate::DocumentBuffer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum number of undo history entries; older entries are dropped.
    pub undo_limit: usize,
    /// Width of a tab stop, in columns.
    pub tab_size: usize,
    /// Initial gap of the character store, in chars.
    pub initial_gap: usize,
    /// Whether the document starts out read-only.
    pub read_only: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            undo_limit: DEFAULT_UNDO_LIMIT,
            tab_size: DEFAULT_TAB_SIZE,
            initial_gap: DEFAULT_INITIAL_GAP,
            read_only: false,
        }
    }
}
