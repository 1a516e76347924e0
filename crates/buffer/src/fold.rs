// Chunk: docs/chunks/line_state_cache - Lazy fold level and tokenizer state caches

//! Fold handler collaborator contract and the two stock handlers.
//!
//! A fold handler assigns every line an integer fold level. The document
//! caches the levels in the [`LineIndex`] and only asks the handler for lines
//! at or past the first stale one, so handlers see lines strictly in order:
//! when `fold_level(ctx, n)` runs, the cached levels of lines `0..n` are
//! current.

use crate::gap_buffer::{GapTextStore, TextSegment};
use crate::line_index::LineIndex;

/// Read-only view of the document handed to a [`FoldHandler`].
#[derive(Debug, Clone, Copy)]
pub struct FoldContext<'a> {
    store: &'a GapTextStore,
    lines: &'a LineIndex,
    tab_size: usize,
}

impl<'a> FoldContext<'a> {
    pub(crate) fn new(store: &'a GapTextStore, lines: &'a LineIndex, tab_size: usize) -> Self {
        Self {
            store,
            lines,
            tab_size,
        }
    }

    /// Number of lines in the document.
    pub fn line_count(&self) -> usize {
        self.lines.line_count()
    }

    /// Text of `line` without its terminator, split at the store's gap.
    ///
    /// Panics if `line` is out of range.
    pub fn line_segment(&self, line: usize) -> TextSegment<'a> {
        let start = self.lines.line_start_offset(line);
        let end = self.lines.line_end_offset(line) - 1;
        self.store.segment(start, end - start)
    }

    /// Text of `line` without its terminator.
    pub fn line_text(&self, line: usize) -> String {
        self.line_segment(line).to_string()
    }

    /// Cached fold level of `line`.
    ///
    /// Only lines before the one currently being computed are guaranteed
    /// to be up to date.
    pub fn fold_level(&self, line: usize) -> u32 {
        self.lines.cached_fold_level(line)
    }

    pub fn tab_size(&self) -> usize {
        self.tab_size
    }
}

/// Computes fold levels for a document mode.
///
/// Injected per document; see [`DocumentBuffer::set_fold_handler`].
///
/// [`DocumentBuffer::set_fold_handler`]: crate::DocumentBuffer::set_fold_handler
pub trait FoldHandler: Send + Sync {
    /// Short identifier, used in logs.
    fn name(&self) -> &str;

    /// Returns the fold level of `line`.
    fn fold_level(&self, ctx: &FoldContext<'_>, line: usize) -> u32;

    /// Optionally revises the levels of lines directly above `line`.
    ///
    /// Called for every line the document recomputes, right after its
    /// level. Return `None` when the lines above need no change. The returned
    /// list is applied walking upward: element 0 becomes the level of
    /// `line - 1`, element 1 of `line - 2`, and so on.
    fn preceding_fold_levels(
        &self,
        _ctx: &FoldContext<'_>,
        _line: usize,
        _level: u32,
    ) -> Option<Vec<u32>> {
        None
    }
}

/// Every line has fold level 0; nothing ever folds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFoldHandler;

impl FoldHandler for NoFoldHandler {
    fn name(&self) -> &str {
        "none"
    }

    fn fold_level(&self, _ctx: &FoldContext<'_>, _line: usize) -> u32 {
        0
    }
}

/// Folds by indentation.
///
/// A line's level is the display width of its leading whitespace. A blank
/// line takes the level of the line above it; once the next non-blank line is
/// known, the blank run in between is raised to that line's level if it is
/// deeper, so trailing blank lines inside a block fold with the block.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndentFoldHandler;

impl IndentFoldHandler {
    /// Leading whitespace width, or `None` for a blank line.
    fn indent_width(segment: TextSegment<'_>, tab_size: usize) -> Option<u32> {
        let tab_size = tab_size.max(1);
        let mut width = 0usize;
        for ch in segment.chars() {
            match ch {
                ' ' => width += 1,
                '\t' => width += tab_size - width % tab_size,
                _ => return Some(width as u32),
            }
        }
        None
    }
}

impl FoldHandler for IndentFoldHandler {
    fn name(&self) -> &str {
        "indent"
    }

    fn fold_level(&self, ctx: &FoldContext<'_>, line: usize) -> u32 {
        match Self::indent_width(ctx.line_segment(line), ctx.tab_size()) {
            Some(width) => width,
            None if line == 0 => 0,
            None => ctx.fold_level(line - 1),
        }
    }

    fn preceding_fold_levels(
        &self,
        ctx: &FoldContext<'_>,
        line: usize,
        level: u32,
    ) -> Option<Vec<u32>> {
        let tab_size = ctx.tab_size();
        let mut first_blank = line;
        while first_blank > 0
            && Self::indent_width(ctx.line_segment(first_blank - 1), tab_size).is_none()
        {
            first_blank -= 1;
        }
        if first_blank == line {
            return None;
        }

        let base = if first_blank == 0 {
            0
        } else {
            ctx.fold_level(first_blank - 1)
        };
        let blank_level = base.max(level);

        let unchanged = (first_blank..line).all(|l| ctx.fold_level(l) == blank_level);
        if unchanged {
            return None;
        }
        Some(vec![blank_level; line - first_blank])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_for(text: &str) -> (GapTextStore, LineIndex) {
        let store = GapTextStore::from_str(text);
        let mut lines = LineIndex::new();
        lines.rebuild(store.chars());
        (store, lines)
    }

    #[test]
    fn test_line_text_excludes_terminator() {
        let (store, lines) = index_for("abc\ndef");
        let ctx = FoldContext::new(&store, &lines, 4);
        assert_eq!(ctx.line_count(), 2);
        assert_eq!(ctx.line_text(0), "abc");
        assert_eq!(ctx.line_text(1), "def");
    }

    #[test]
    fn test_no_fold_handler_is_flat() {
        let (store, lines) = index_for("a\n  b\n");
        let ctx = FoldContext::new(&store, &lines, 4);
        assert_eq!(NoFoldHandler.fold_level(&ctx, 1), 0);
    }

    #[test]
    fn test_indent_width_counts_tabs_to_stops() {
        let (store, lines) = index_for("\tx\n  \tx\n    x");
        let ctx = FoldContext::new(&store, &lines, 4);
        assert_eq!(IndentFoldHandler.fold_level(&ctx, 0), 4);
        assert_eq!(IndentFoldHandler.fold_level(&ctx, 1), 4);
        assert_eq!(IndentFoldHandler.fold_level(&ctx, 2), 4);
    }

    #[test]
    fn test_blank_line_inherits_previous_cached_level() {
        let (store, mut lines) = index_for("  a\n\nb");
        lines.set_fold_level(0, 2);
        let ctx = FoldContext::new(&store, &lines, 4);
        assert_eq!(IndentFoldHandler.fold_level(&ctx, 1), 2);
    }

    #[test]
    fn test_blank_first_line_is_level_zero() {
        let (store, lines) = index_for("\n  a");
        let ctx = FoldContext::new(&store, &lines, 4);
        assert_eq!(IndentFoldHandler.fold_level(&ctx, 0), 0);
    }

    #[test]
    fn test_preceding_blank_run_raised_to_deeper_line() {
        // def / blank / blank / indented body
        let (store, lines) = index_for("def\n\n\n    body");
        let ctx = FoldContext::new(&store, &lines, 4);
        let levels = IndentFoldHandler.preceding_fold_levels(&ctx, 3, 4);
        assert_eq!(levels, Some(vec![4, 4]));
    }

    #[test]
    fn test_preceding_blank_run_lowered_after_dedent() {
        let (store, mut lines) = index_for("    a\n\nb");
        lines.set_fold_level(0, 4);
        lines.set_fold_level(1, 8);
        let ctx = FoldContext::new(&store, &lines, 4);
        assert_eq!(
            IndentFoldHandler.preceding_fold_levels(&ctx, 2, 0),
            Some(vec![4])
        );
    }

    #[test]
    fn test_preceding_none_without_blank_lines() {
        let (store, lines) = index_for("a\n  b");
        let ctx = FoldContext::new(&store, &lines, 4);
        assert_eq!(IndentFoldHandler.preceding_fold_levels(&ctx, 1, 2), None);
    }
}
