// Chunk: docs/chunks/document_buffer - Document facade, listeners and locking

//! Error type shared by every fallible document operation.

use thiserror::Error;

/// Errors returned by [`DocumentBuffer`](crate::DocumentBuffer) operations.
///
/// None of these leave the document modified: every check runs before the
/// first byte of storage is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// An offset/length pair reaches outside `0..=len`.
    ///
    /// Always a caller bug; surfaced immediately.
    #[error("range {offset}+{length} is outside the document (length {len})")]
    OutOfBounds {
        offset: usize,
        length: usize,
        len: usize,
    },

    /// A line-addressed query named a line past the last one.
    #[error("line {line} is outside the document ({line_count} lines)")]
    LineOutOfBounds { line: usize, line_count: usize },

    /// The document is read-only or an I/O operation is in flight.
    #[error("document is not editable")]
    ReadOnly,

    /// `undo()`/`redo()` was called while a compound edit is still open.
    #[error("cannot replay history while a compound edit is open")]
    CompoundEditOpen,

    /// A bulk load supplied a line table that does not describe the text.
    #[error("invalid line table at entry {index}: {reason}")]
    InvalidLineTable { index: usize, reason: &'static str },
}

/// Result alias used throughout the crate.
pub type Result<T, E = BufferError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_message() {
        let err = BufferError::OutOfBounds {
            offset: 10,
            length: 2,
            len: 8,
        };
        assert_eq!(
            err.to_string(),
            "range 10+2 is outside the document (length 8)"
        );
    }

    #[test]
    fn test_line_table_message() {
        let err = BufferError::InvalidLineTable {
            index: 3,
            reason: "offsets must increase",
        };
        assert_eq!(
            err.to_string(),
            "invalid line table at entry 3: offsets must increase"
        );
    }
}
