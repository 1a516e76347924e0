// Chunk: docs/chunks/line_state_cache - Lazy fold level and tokenizer state caches

//! Tokenizer collaborator contract.
//!
//! The document never interprets tokens or tokenizer state. It only caches the
//! [`LineContext`] each line hands to the next one, so re-tokenizing line `n`
//! does not require re-running lines `0..n`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque parser state carried from the end of one line into the next.
///
/// Cheap to clone. Two contexts are equal when they share an allocation or
/// wrap equal values of the same type.
#[derive(Clone)]
pub struct LineContext(Arc<dyn ContextState>);

impl LineContext {
    /// Wraps a tokenizer-defined state value.
    pub fn new<T>(state: T) -> Self
    where
        T: Any + fmt::Debug + PartialEq + Send + Sync,
    {
        Self(Arc::new(state))
    }

    /// Returns the wrapped state if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for LineContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.eq_state(other.0.as_any())
    }
}

impl fmt::Debug for LineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LineContext").field(&self.0).finish()
    }
}

trait ContextState: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn eq_state(&self, other: &dyn Any) -> bool;
}

impl<T> ContextState for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_state(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| self == other)
    }
}

/// A run of characters within one line sharing a tokenizer-assigned style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Tokenizer-defined style id.
    pub style: u16,
    /// Column of the first character of the token.
    pub start: usize,
    /// Length in chars.
    pub len: usize,
}

/// Result of tokenizing one line.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedLine {
    pub tokens: Vec<Token>,
    /// State handed to the following line.
    pub context: LineContext,
}

/// Splits lines into tokens, threading state from line to line.
pub trait Tokenizer: Send + Sync {
    /// Tokenizes `line` (without its terminator).
    ///
    /// `prev` is the context left by the previous line; `None` for the first
    /// line, and always `None` when [`is_context_sensitive`] returns false.
    ///
    /// [`is_context_sensitive`]: Tokenizer::is_context_sensitive
    fn mark_tokens(&self, prev: Option<&LineContext>, line: &str) -> TokenizedLine;

    /// Whether tokenizing a line depends on the state of the line before it.
    ///
    /// Context-insensitive grammars let the document tokenize a single line
    /// without walking back to the first stale one.
    fn is_context_sensitive(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct InComment(bool);

    #[test]
    fn test_context_equality_by_value() {
        let a = LineContext::new(InComment(true));
        let b = LineContext::new(InComment(true));
        let c = LineContext::new(InComment(false));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_context_different_types_never_equal() {
        let a = LineContext::new(InComment(true));
        let b = LineContext::new(1u32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_downcast() {
        let ctx = LineContext::new(InComment(true));
        assert_eq!(ctx.downcast_ref::<InComment>(), Some(&InComment(true)));
        assert!(ctx.downcast_ref::<u32>().is_none());
    }
}
