// Chunk: docs/chunks/document_model - Crate overview and public surface

//! quill-buffer: the document model of the quill editor.
//!
//! This crate holds an editable document in memory: a gap buffer of chars,
//! a line index that survives edits near the top of large files cheaply,
//! floating positions that follow the text they point at, and an undo
//! history that merges keystrokes and groups compound edits.
//!
//! # Overview
//!
//! The main type is [`DocumentBuffer`]. It is shared between one mutating
//! thread and any number of readers and provides:
//! - Insert, remove and replace by char offset
//! - Line queries (line of offset, line bounds, line text)
//! - Undo/redo with compound edits and save-point tracking
//! - Floating [`Position`]s
//! - Change notifications through [`BufferListener`]
//! - Lazily computed fold levels ([`FoldHandler`]) and tokenizer state
//!   ([`Tokenizer`])
//!
//! # Example
//!
//! ```
//! use quill_buffer::DocumentBuffer;
//!
//! let buffer = DocumentBuffer::from_str("abc\ndef\n");
//! assert_eq!(buffer.line_count(), 3);
//!
//! buffer.insert(4, "X").unwrap();
//! assert_eq!(buffer.text(), "abc\nXdef\n");
//! assert_eq!(buffer.line_of_offset(4).unwrap(), 1);
//!
//! let pos = buffer.create_position(5).unwrap();
//! buffer.insert(0, ">> ").unwrap();
//! assert_eq!(pos.offset(), 8);
//!
//! buffer.undo().unwrap();
//! buffer.undo().unwrap();
//! assert_eq!(buffer.text(), "abc\ndef\n");
//! ```
//!
//! # Offsets and lines
//!
//! Offsets count chars, not bytes. A line runs up to and including its
//! `'\n'`; a document ending in `'\n'` has a final empty line, so a
//! document always has at least one line.

mod config;
mod document;
mod error;
mod fold;
mod gap_buffer;
mod line_index;
mod listener;
mod position;
mod state;
mod tokenizer;
mod types;
mod undo;

pub use config::{BufferConfig, DEFAULT_INITIAL_GAP, DEFAULT_TAB_SIZE, DEFAULT_UNDO_LIMIT};
pub use document::{CompoundEdit, DocumentBuffer, LoadedText};
pub use error::{BufferError, Result};
pub use fold::{FoldContext, FoldHandler, IndentFoldHandler, NoFoldHandler};
pub use gap_buffer::{GapTextStore, TextSegment};
pub use line_index::{FoldRefresh, LineIndex};
pub use listener::{BufferListener, ListenerPriority};
pub use position::{Position, PositionTracker};
pub use state::DocumentState;
pub use tokenizer::{LineContext, Token, TokenizedLine, Tokenizer};
pub use types::{BufferPhase, ContentChange, UndoId};
pub use undo::{Edit, EditId, KillRing, Replay, ReplayOp, ReplayStep, TextEdit, UndoEngine};
