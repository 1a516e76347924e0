// Chunk: docs/chunks/gap_text_store - Gap buffer character storage

//! Gap buffer character storage for the document model.
//!
//! A gap buffer is a character array with a movable gap. Every edit first moves
//! the gap to the edit point; after that an insertion copies into the gap and a
//! removal simply widens it. Data movement per edit is bounded by the distance
//! between the previous edit point and the new one, so runs of edits near the
//! same place are amortized O(1) no matter how large the document is.
//!
//! The store knows nothing about lines. Offsets are in `char`s.

use std::borrow::Cow;
use std::fmt;

const DEFAULT_GAP_SIZE: usize = 64;
const GAP_GROWTH_FACTOR: usize = 2;

/// Character storage with a single movable gap.
///
/// Layout of `data` is `[pre-gap content | gap | post-gap content]`. A logical
/// offset below `gap_start` reads `data[offset]`; any other offset reads
/// `data[offset + gap_len]`.
#[derive(Debug, Clone)]
pub struct GapTextStore {
    data: Vec<char>,
    /// Index where the gap starts (first unused slot).
    gap_start: usize,
    /// Index where the gap ends (first used slot after the gap).
    gap_end: usize,
    /// Gap size to re-establish when the content is replaced wholesale.
    initial_gap: usize,
}

impl GapTextStore {
    /// Creates an empty store with the default initial gap.
    pub fn new() -> Self {
        Self::with_gap(DEFAULT_GAP_SIZE)
    }

    /// Creates an empty store whose gap starts at `initial_gap` slots.
    pub fn with_gap(initial_gap: usize) -> Self {
        let initial_gap = initial_gap.max(1);
        Self {
            data: vec!['\0'; initial_gap],
            gap_start: 0,
            gap_end: initial_gap,
            initial_gap,
        }
    }

    /// Creates a store holding `text`, with the gap parked at the end.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Self {
        let mut store = Self::new();
        store.set_content(text.chars().collect());
        store
    }

    /// Returns the number of live characters (excluding the gap).
    pub fn len(&self) -> usize {
        self.data.len() - self.gap_len()
    }

    /// Returns true if the store holds no characters.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn gap_len(&self) -> usize {
        self.gap_end - self.gap_start
    }

    /// Returns the logical offset the gap currently sits at.
    pub fn gap_position(&self) -> usize {
        self.gap_start
    }

    /// Returns the size of the backing allocation, gap included.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Moves the gap to the specified logical position.
    ///
    /// One `copy_within` of the characters between the old and new gap
    /// position; O(distance).
    fn move_gap_to(&mut self, pos: usize) {
        let pos = pos.min(self.len());

        if pos < self.gap_start {
            // Content in [pos, gap_start) slides to the end of the gap
            let shift = self.gap_start - pos;
            self.data.copy_within(pos..self.gap_start, self.gap_end - shift);
            self.gap_start = pos;
            self.gap_end -= shift;
        } else if pos > self.gap_start {
            // Content right after the gap slides down to gap_start
            let shift = pos - self.gap_start;
            self.data.copy_within(self.gap_end..self.gap_end + shift, self.gap_start);
            self.gap_start += shift;
            self.gap_end += shift;
        }
    }

    /// Ensures the gap holds at least `min_size` slots.
    ///
    /// Grows in place: the gap stays where `move_gap_to` left it and the
    /// post-gap content is shifted to the end of the enlarged allocation.
    fn ensure_gap(&mut self, min_size: usize) {
        if self.gap_len() >= min_size {
            return;
        }

        let needed = min_size - self.gap_len();
        let growth = needed.max(self.data.len() * (GAP_GROWTH_FACTOR - 1));

        let old_gap_end = self.gap_end;
        let old_len = self.data.len();
        let post_gap_len = old_len - old_gap_end;

        let new_size = old_len + growth;
        self.data.resize(new_size, '\0');

        if post_gap_len > 0 {
            self.data.copy_within(old_gap_end..old_len, new_size - post_gap_len);
        }

        self.gap_end = new_size - post_gap_len;
    }

    /// Inserts `chars` so that the first one lands at logical offset `start`.
    pub fn insert(&mut self, start: usize, chars: &[char]) {
        debug_assert!(start <= self.len(), "insert at {start} past end {}", self.len());
        if chars.is_empty() {
            return;
        }

        self.move_gap_to(start);
        self.ensure_gap(chars.len());
        self.data[self.gap_start..self.gap_start + chars.len()].copy_from_slice(chars);
        self.gap_start += chars.len();
    }

    /// Removes `len` characters starting at `start`.
    ///
    /// The removed span simply becomes part of the gap.
    pub fn remove(&mut self, start: usize, len: usize) {
        debug_assert!(
            start + len <= self.len(),
            "remove {start}+{len} past end {}",
            self.len()
        );
        if len == 0 {
            return;
        }

        self.move_gap_to(start);
        self.gap_end += len;
    }

    /// Replaces the whole content, leaving the gap after the last character.
    pub fn set_content(&mut self, mut chars: Vec<char>) {
        let len = chars.len();
        chars.resize(len + self.initial_gap, '\0');
        self.data = chars;
        self.gap_start = len;
        self.gap_end = self.data.len();
    }

    /// Returns the character at `pos`, or `None` past the end.
    pub fn char_at(&self, pos: usize) -> Option<char> {
        if pos >= self.len() {
            return None;
        }
        let physical = if pos < self.gap_start {
            pos
        } else {
            pos + self.gap_len()
        };
        Some(self.data[physical])
    }

    /// Returns an iterator over every live character.
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.data[..self.gap_start]
            .iter()
            .chain(self.data[self.gap_end..].iter())
            .copied()
    }

    /// Returns a two-segment view of `[start, start + len)`.
    ///
    /// Never copies; use this when the range may straddle the gap and the
    /// caller can consume the two halves separately.
    pub fn segment(&self, start: usize, len: usize) -> TextSegment<'_> {
        debug_assert!(start + len <= self.len());
        let end = start + len;
        let gap_len = self.gap_len();

        if end <= self.gap_start {
            TextSegment {
                head: &self.data[start..end],
                tail: &[],
            }
        } else if start >= self.gap_start {
            TextSegment {
                head: &self.data[start + gap_len..end + gap_len],
                tail: &[],
            }
        } else {
            TextSegment {
                head: &self.data[start..self.gap_start],
                tail: &self.data[self.gap_end..end + gap_len],
            }
        }
    }

    /// Returns `[start, start + len)` as a slice.
    ///
    /// Borrowed when the range lies entirely on one side of the gap; otherwise
    /// the two sides are concatenated into a fresh buffer.
    pub fn get_chars(&self, start: usize, len: usize) -> Cow<'_, [char]> {
        let segment = self.segment(start, len);
        if segment.tail.is_empty() {
            Cow::Borrowed(segment.head)
        } else {
            let mut joined = Vec::with_capacity(len);
            joined.extend_from_slice(segment.head);
            joined.extend_from_slice(segment.tail);
            Cow::Owned(joined)
        }
    }

    /// Returns `[start, start + len)` as a `String`.
    pub fn get_text(&self, start: usize, len: usize) -> String {
        self.segment(start, len).to_string()
    }
}

impl Default for GapTextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GapTextStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.segment(0, self.len()), f)
    }
}

/// A borrowed range of the store, split at the gap.
///
/// `tail` is empty unless the range straddles the gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSegment<'a> {
    pub head: &'a [char],
    pub tail: &'a [char],
}

impl<'a> TextSegment<'a> {
    pub fn len(&self) -> usize {
        self.head.len() + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + 'a {
        let (head, tail) = (self.head, self.tail);
        head.iter().chain(tail.iter()).copied()
    }
}

impl fmt::Display for TextSegment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;
        for ch in self.chars() {
            f.write_char(ch)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_new_empty() {
        let store = GapTextStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert_eq!(store.to_string(), "");
    }

    #[test]
    fn test_from_str() {
        let store = GapTextStore::from_str("hello");
        assert_eq!(store.len(), 5);
        assert_eq!(store.to_string(), "hello");
        assert_eq!(store.gap_position(), 5);
    }

    #[test]
    fn test_insert_at_end() {
        let mut store = GapTextStore::new();
        store.insert(0, &chars("abc"));
        store.insert(3, &chars("def"));
        assert_eq!(store.to_string(), "abcdef");
    }

    #[test]
    fn test_insert_in_middle() {
        let mut store = GapTextStore::from_str("ac");
        store.insert(1, &chars("b"));
        assert_eq!(store.to_string(), "abc");
        assert_eq!(store.gap_position(), 2);
    }

    #[test]
    fn test_insert_at_start_after_gap_moved() {
        let mut store = GapTextStore::from_str("world");
        store.insert(0, &chars("hello "));
        assert_eq!(store.to_string(), "hello world");
    }

    #[test]
    fn test_remove_extends_gap() {
        let mut store = GapTextStore::from_str("abcdef");
        store.remove(1, 3);
        assert_eq!(store.to_string(), "aef");
        assert_eq!(store.len(), 3);
        assert_eq!(store.gap_position(), 1);
    }

    #[test]
    fn test_remove_everything() {
        let mut store = GapTextStore::from_str("abc");
        store.remove(0, 3);
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_then_insert_at_same_point() {
        let mut store = GapTextStore::from_str("hello world");
        store.remove(6, 5);
        store.insert(6, &chars("there"));
        assert_eq!(store.to_string(), "hello there");
    }

    #[test]
    fn test_growth_is_geometric() {
        let mut store = GapTextStore::with_gap(4);
        let before = store.capacity();
        store.insert(0, &chars("abcdefgh"));
        assert!(store.capacity() >= before * 2);
        assert_eq!(store.to_string(), "abcdefgh");
    }

    #[test]
    fn test_growth_preserves_post_gap_content() {
        let mut store = GapTextStore::with_gap(2);
        store.insert(0, &chars("ab"));
        store.insert(1, &chars("xyz"));
        assert_eq!(store.to_string(), "axyzb");
        store.insert(0, &chars("0123456789"));
        assert_eq!(store.to_string(), "0123456789axyzb");
    }

    #[test]
    fn test_char_at_across_gap() {
        let mut store = GapTextStore::from_str("hello");
        store.insert(2, &chars("XX"));
        assert_eq!(store.char_at(0), Some('h'));
        assert_eq!(store.char_at(2), Some('X'));
        assert_eq!(store.char_at(4), Some('l'));
        assert_eq!(store.char_at(6), Some('o'));
        assert_eq!(store.char_at(7), None);
    }

    #[test]
    fn test_get_chars_borrows_when_not_straddling() {
        let mut store = GapTextStore::from_str("abcdef");
        store.insert(3, &chars("-"));
        // Gap now sits at 4
        assert!(matches!(store.get_chars(0, 3), Cow::Borrowed(_)));
        assert!(matches!(store.get_chars(4, 3), Cow::Borrowed(_)));
        let straddle = store.get_chars(2, 4);
        assert!(matches!(straddle, Cow::Owned(_)));
        assert_eq!(straddle.iter().collect::<String>(), "c-de");
    }

    #[test]
    fn test_segment_splits_at_gap() {
        let mut store = GapTextStore::from_str("abcdef");
        store.insert(3, &chars("X"));
        let seg = store.segment(1, 5);
        assert_eq!(seg.head.iter().collect::<String>(), "bcX");
        assert_eq!(seg.tail.iter().collect::<String>(), "de");
        assert_eq!(seg.to_string(), "bcXde");
        assert_eq!(seg.len(), 5);
    }

    #[test]
    fn test_get_text() {
        let store = GapTextStore::from_str("hello world");
        assert_eq!(store.get_text(0, 5), "hello");
        assert_eq!(store.get_text(6, 5), "world");
        assert_eq!(store.get_text(11, 0), "");
    }

    #[test]
    fn test_set_content_replaces_everything() {
        let mut store = GapTextStore::from_str("old text");
        store.insert(3, &chars("!"));
        store.set_content(chars("new"));
        assert_eq!(store.to_string(), "new");
        assert_eq!(store.gap_position(), 3);
    }

    #[test]
    fn test_many_small_inserts() {
        let mut store = GapTextStore::new();
        for i in 0..1000 {
            let ch = char::from_u32('a' as u32 + (i % 26) as u32).unwrap();
            store.insert(store.len(), &[ch]);
        }
        assert_eq!(store.len(), 1000);
    }
}
