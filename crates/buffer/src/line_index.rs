// Chunk: docs/chunks/line_index - Gap-line optimized line end index
// Chunk: docs/chunks/line_state_cache - Lazy fold level and tokenizer state caches

//! Line index for the document model.
//!
//! One record per physical line holds the offset just past the line's
//! terminator, a cached fold level and a cached tokenizer context. The last
//! line's end offset is a sentinel equal to the document length plus one, so
//! every line (including an empty trailing one) has a terminator-shaped end.
//!
//! # The gap line
//!
//! An edit shifts the end offset of every later line. Rewriting them all
//! makes typing at the top of a large file O(lines). Instead the index keeps a
//! *gap line* and a *gap width*: records at or after the gap line store their
//! end offset minus the gap width. Shifting all of them is one addition to the
//! width. Moving the gap only rewrites the records between its old and new
//! position, so consecutive edits in the same area touch few records.
//!
//! # Lazy caches
//!
//! Fold levels and tokenizer contexts each have a watermark: the first line
//! whose cached value is stale (`None` once everything is current). Edits only
//! lower the watermarks; values are recomputed on demand, walking forward from
//! the watermark to the requested line.

use crate::fold::{FoldContext, FoldHandler};
use crate::gap_buffer::GapTextStore;
use crate::tokenizer::{LineContext, Token, Tokenizer};

#[derive(Debug, Clone)]
struct LineRecord {
    /// End offset, biased by the gap width for records at/after the gap line.
    end: isize,
    fold_level: u32,
    context: Option<LineContext>,
}

impl LineRecord {
    fn new(end: isize) -> Self {
        Self {
            end,
            fold_level: 0,
            context: None,
        }
    }
}

/// Outcome of a lazy fold level lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldRefresh {
    /// Fold level of the requested line.
    pub level: u32,
    /// Lines whose cached level changed, inclusive, if any did.
    pub changed: Option<(usize, usize)>,
}

/// Maps line numbers to offsets and caches per-line derived state.
#[derive(Debug, Clone)]
pub struct LineIndex {
    records: Vec<LineRecord>,
    /// First record stored relative to `gap_width`, or `None` when every
    /// record holds its absolute end offset.
    gap_line: Option<usize>,
    gap_width: isize,
    first_invalid_fold_level: Option<usize>,
    first_invalid_line_context: Option<usize>,
}

impl LineIndex {
    /// Creates the index of an empty document: one line, nothing cached.
    pub fn new() -> Self {
        Self {
            records: vec![LineRecord::new(1)],
            gap_line: None,
            gap_width: 0,
            first_invalid_fold_level: Some(0),
            first_invalid_line_context: Some(0),
        }
    }

    /// Rebuilds the index by scanning `content` for line terminators.
    ///
    /// O(n) in the content length; the bulk load path uses [`reset`] with a
    /// precomputed table instead.
    ///
    /// [`reset`]: LineIndex::reset
    pub fn rebuild<I>(&mut self, content: I)
    where
        I: IntoIterator<Item = char>,
    {
        let mut ends = Vec::new();
        let mut len = 0;
        for ch in content {
            len += 1;
            if ch == '\n' {
                ends.push(len);
            }
        }
        self.reset(&ends, len);
    }

    /// Replaces the whole index.
    ///
    /// `line_ends` holds the offset just past every line terminator in a
    /// document of `len` characters; the sentinel line is added here. All
    /// cached state is invalidated.
    pub fn reset(&mut self, line_ends: &[usize], len: usize) {
        self.records.clear();
        self.records.reserve(line_ends.len() + 1);
        self.records
            .extend(line_ends.iter().map(|&end| LineRecord::new(end as isize)));
        self.records.push(LineRecord::new(len as isize + 1));
        self.gap_line = None;
        self.gap_width = 0;
        self.first_invalid_fold_level = Some(0);
        self.first_invalid_line_context = Some(0);
    }

    /// Returns the number of lines. Always at least 1.
    pub fn line_count(&self) -> usize {
        self.records.len()
    }

    /// Returns the offset just past `line`'s terminator.
    ///
    /// For the last line this is the document length plus one.
    pub fn line_end_offset(&self, line: usize) -> usize {
        let mut end = self.records[line].end;
        if self.gap_line.is_some_and(|gap| line >= gap) {
            end += self.gap_width;
        }
        debug_assert!(end > 0, "line {line} end offset drifted to {end}");
        end as usize
    }

    /// Returns the offset of the first character of `line`.
    pub fn line_start_offset(&self, line: usize) -> usize {
        if line == 0 {
            0
        } else {
            self.line_end_offset(line - 1)
        }
    }

    /// Returns the line containing `offset`.
    ///
    /// Binary search over end offsets: the answer is the number of lines that
    /// end at or before `offset`.
    pub fn line_of_offset(&self, offset: usize) -> usize {
        let mut lo = 0;
        let mut hi = self.line_count();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.line_end_offset(mid) <= offset {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo.min(self.line_count() - 1)
    }

    // ==================== Structural updates ====================

    /// Updates the index after `length` chars were inserted at `offset`.
    ///
    /// `start_line` is the line that contained `offset` before the insert.
    /// `new_line_ends` holds, for each of the `num_lines` inserted
    /// terminators, the offset just past it relative to `offset`.
    pub fn on_content_inserted(
        &mut self,
        start_line: usize,
        offset: usize,
        num_lines: usize,
        length: usize,
        new_line_ends: &[usize],
    ) {
        debug_assert_eq!(num_lines, new_line_ends.len());
        let end_line = start_line + num_lines;

        if num_lines > 0 {
            let mut base = offset as isize;
            match self.gap_line {
                Some(gap) if start_line <= gap => self.gap_line = Some(gap + num_lines),
                Some(_) => base -= self.gap_width,
                None => {}
            }

            // Splitting line `start_line`: the new records take its place and
            // the original record (now the tail of the split) moves down.
            self.records.splice(
                start_line..start_line,
                new_line_ends
                    .iter()
                    .map(|&end| LineRecord::new(base + end as isize)),
            );
        }

        self.invalidate_fold_levels_from(start_line);
        self.invalidate_tokenizer_from(start_line);
        self.move_gap(end_line, length as isize);
    }

    /// Updates the index after `length` chars holding `num_lines` terminators
    /// were removed at `offset`, which lies in `start_line`.
    pub fn on_content_removed(
        &mut self,
        start_line: usize,
        _offset: usize,
        num_lines: usize,
        length: usize,
    ) {
        let end_line = start_line + num_lines;

        if num_lines > 0 {
            if let Some(gap) = self.gap_line {
                if end_line < gap {
                    self.gap_line = Some(gap - num_lines);
                } else if start_line < gap {
                    self.gap_line = Some(start_line);
                }
            }

            // Lines start_line..end_line merge into the record at end_line.
            self.records.drain(start_line..end_line);
        }

        self.invalidate_fold_levels_from(start_line);
        self.invalidate_tokenizer_from(start_line);
        self.move_gap(start_line, -(length as isize));
    }

    /// Moves the gap to `new_gap_line` and widens it by `delta`.
    ///
    /// Only records between the old and the new gap line are rewritten.
    fn move_gap(&mut self, new_gap_line: usize, delta: isize) {
        match self.gap_line {
            None => self.gap_width = delta,
            Some(gap) if new_gap_line < gap => {
                if self.gap_width != 0 {
                    for record in &mut self.records[new_gap_line..gap] {
                        record.end -= self.gap_width;
                    }
                }
                self.gap_width += delta;
            }
            Some(gap) => {
                if self.gap_width != 0 {
                    for record in &mut self.records[gap..new_gap_line] {
                        record.end += self.gap_width;
                    }
                }
                self.gap_width += delta;
            }
        }

        if new_gap_line >= self.line_count() {
            self.gap_line = None;
            self.gap_width = 0;
        } else {
            self.gap_line = Some(new_gap_line);
        }
    }

    // ==================== Fold levels ====================

    /// Cached fold level of `line`, stale or not.
    pub fn cached_fold_level(&self, line: usize) -> u32 {
        self.records[line].fold_level
    }

    /// Fold level of `line` if its cached value is current.
    pub fn valid_fold_level(&self, line: usize) -> Option<u32> {
        match self.first_invalid_fold_level {
            Some(first) if line >= first => None,
            _ => Some(self.records[line].fold_level),
        }
    }

    pub fn set_fold_level(&mut self, line: usize, level: u32) {
        self.records[line].fold_level = level;
    }

    /// First line whose cached fold level is stale; `None` when all are current.
    pub fn first_invalid_fold_level(&self) -> Option<usize> {
        self.first_invalid_fold_level
    }

    /// Marks fold levels of `line` and everything after it as stale.
    pub fn invalidate_fold_levels_from(&mut self, line: usize) {
        let line = line.min(self.line_count() - 1);
        self.first_invalid_fold_level = Some(match self.first_invalid_fold_level {
            Some(first) => first.min(line),
            None => line,
        });
    }

    /// Returns the fold level of `line`, recomputing stale levels on the way.
    ///
    /// The handler runs once for each line from the watermark to `line`
    /// inclusive, and is offered every recomputed line for
    /// [`FoldHandler::preceding_fold_levels`]; lines before the watermark are
    /// never revisited otherwise.
    pub fn refresh_fold_levels(
        &mut self,
        line: usize,
        store: &GapTextStore,
        handler: &dyn FoldHandler,
        tab_size: usize,
    ) -> FoldRefresh {
        let first_invalid = match self.first_invalid_fold_level {
            Some(first) if line >= first => first,
            _ => {
                return FoldRefresh {
                    level: self.records[line].fold_level,
                    changed: None,
                }
            }
        };

        let mut level = 0;
        let mut changed = false;
        let mut first_updated = first_invalid;

        for i in first_invalid..=line {
            let (new_level, preceding) = {
                let ctx = FoldContext::new(store, self, tab_size);
                let new_level = handler.fold_level(&ctx, i);
                changed |= new_level != self.records[i].fold_level;
                // Records shifted by an edit can hold a stale level equal to the new one
                let preceding = handler.preceding_fold_levels(&ctx, i, new_level);
                (new_level, preceding)
            };

            if let Some(preceding) = preceding {
                changed = true;
                let mut j = i;
                for prev_level in preceding {
                    if j == 0 {
                        break;
                    }
                    j -= 1;
                    self.records[j].fold_level = prev_level;
                }
                first_updated = first_updated.min(j);
            }

            self.records[i].fold_level = new_level;
            level = new_level;
        }

        self.first_invalid_fold_level = if line + 1 == self.line_count() {
            None
        } else {
            Some(line + 1)
        };

        FoldRefresh {
            level,
            changed: changed.then_some((first_updated, line)),
        }
    }

    // ==================== Tokenizer contexts ====================

    /// Cached context at the end of `line`, stale or not.
    pub fn tokenizer_state(&self, line: usize) -> Option<&LineContext> {
        self.records[line].context.as_ref()
    }

    pub fn set_tokenizer_state(&mut self, line: usize, context: Option<LineContext>) {
        self.records[line].context = context;
    }

    /// First line whose cached context is stale; `None` when all are current.
    pub fn first_invalid_line_context(&self) -> Option<usize> {
        self.first_invalid_line_context
    }

    /// Marks tokenizer contexts of `line` and everything after it as stale.
    pub fn invalidate_tokenizer_from(&mut self, line: usize) {
        let line = line.min(self.line_count() - 1);
        self.first_invalid_line_context = Some(match self.first_invalid_line_context {
            Some(first) => first.min(line),
            None => line,
        });
    }

    /// Tokenizes `line`, first bringing stale contexts before it up to date.
    ///
    /// Context-insensitive tokenizers never read the previous line's context,
    /// so only `line` itself is processed.
    pub fn refresh_line_contexts(
        &mut self,
        line: usize,
        store: &GapTextStore,
        tokenizer: &dyn Tokenizer,
    ) -> Vec<Token> {
        let context_sensitive = tokenizer.is_context_sensitive();
        let first_invalid = self.first_invalid_line_context;
        let start = match first_invalid {
            Some(first) if context_sensitive => first.min(line),
            _ => line,
        };

        let mut tokens = Vec::new();
        let mut context_changed = false;
        for i in start..=line {
            let text = self.line_text(store, i);
            let prev = if i == 0 || !context_sensitive {
                None
            } else {
                self.tokenizer_state(i - 1).cloned()
            };
            let tokenized = tokenizer.mark_tokens(prev.as_ref(), &text);
            let old = self.records[i].context.replace(tokenized.context);
            if i == line {
                context_changed = old.as_ref() != self.records[i].context.as_ref();
                tokens = tokenized.tokens;
            }
        }

        self.first_invalid_line_context = if line + 1 == self.line_count() {
            None
        } else if context_changed {
            Some(line + 1)
        } else {
            first_invalid.map(|first| first.max(line + 1))
        };

        tokens
    }

    fn line_text(&self, store: &GapTextStore, line: usize) -> String {
        let start = self.line_start_offset(line);
        let end = self.line_end_offset(line) - 1;
        store.get_text(start, end - start)
    }

    // ==================== Validation ====================

    /// Absolute end offsets of every line (debug validation).
    #[cfg(any(debug_assertions, test))]
    pub fn line_ends(&self) -> Vec<usize> {
        (0..self.line_count())
            .map(|line| self.line_end_offset(line))
            .collect()
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new()
    }
}
