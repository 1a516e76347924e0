// Chunk: docs/chunks/undo_history - Mergeable, bounded undo/redo history

//! Undo and redo through the document facade.

use std::sync::Arc;

use parking_lot::Mutex;
use quill_buffer::{BufferConfig, BufferError, DocumentBuffer, KillRing};

#[test]
fn test_undo_restores_text_and_caret() {
    let buf = DocumentBuffer::from_str("hello");
    buf.insert(5, " world").unwrap();
    assert_eq!(buf.undo().unwrap(), Some(5));
    assert_eq!(buf.text(), "hello");
    assert_eq!(buf.redo().unwrap(), Some(11));
    assert_eq!(buf.text(), "hello world");

    buf.remove(0, 6).unwrap();
    assert_eq!(buf.undo().unwrap(), Some(6));
    assert_eq!(buf.text(), "hello world");
    assert_eq!(buf.redo().unwrap(), Some(0));
    assert_eq!(buf.text(), "world");
}

#[test]
fn test_typing_is_one_undo_step() {
    let buf = DocumentBuffer::new();
    for (i, ch) in "typed".chars().enumerate() {
        buf.insert(i, &ch.to_string()).unwrap();
    }
    assert_eq!(buf.undo().unwrap(), Some(0));
    assert!(buf.is_empty());
    assert!(!buf.can_undo());
}

#[test]
fn test_limit_one_history() {
    let buf = DocumentBuffer::from_str("abc\ndef\n");
    buf.set_undo_limit(1);
    buf.insert(4, "X").unwrap();
    buf.remove(4, 1).unwrap();
    assert_eq!(buf.text(), "abc\ndef\n");

    buf.undo().unwrap();
    assert_eq!(buf.text(), "abc\nXdef\n");
    assert!(!buf.can_undo());
    assert_eq!(buf.undo().unwrap(), None);
}

#[test]
fn test_config_limit_applies() {
    let buf = DocumentBuffer::with_config(BufferConfig {
        undo_limit: 2,
        ..BufferConfig::default()
    });
    buf.insert(0, "a").unwrap();
    buf.insert(0, "\n").unwrap();
    buf.remove(1, 1).unwrap();
    buf.insert(1, "zz").unwrap();
    assert_eq!(buf.read().undo_limit(), 2);

    buf.undo().unwrap();
    buf.undo().unwrap();
    assert!(!buf.can_undo());
}

#[test]
fn test_new_edit_discards_redo() {
    let buf = DocumentBuffer::from_str("abc");
    buf.insert(3, "d").unwrap();
    buf.undo().unwrap();
    assert!(buf.can_redo());
    buf.insert(0, "x").unwrap();
    assert!(!buf.can_redo());
    assert_eq!(buf.redo().unwrap(), None);
}

#[test]
fn test_compound_edit_undoes_together() {
    let buf = DocumentBuffer::from_str("one two three");
    buf.begin_compound();
    buf.remove(4, 4).unwrap();
    buf.insert(0, "zero ").unwrap();
    buf.insert(buf.len(), "!").unwrap();
    buf.end_compound();
    assert_eq!(buf.text(), "zero one three!");

    buf.undo().unwrap();
    assert_eq!(buf.text(), "one two three");
    buf.redo().unwrap();
    assert_eq!(buf.text(), "zero one three!");
}

#[test]
fn test_nested_compound_commits_at_outermost_end() {
    let buf = DocumentBuffer::new();
    buf.begin_compound();
    buf.insert(0, "a").unwrap();
    buf.begin_compound();
    buf.insert(0, "\n").unwrap();
    buf.end_compound();
    assert!(!buf.can_undo());
    buf.insert(2, "c").unwrap();
    buf.end_compound();

    assert!(buf.can_undo());
    buf.undo().unwrap();
    assert!(buf.is_empty());
}

#[test]
fn test_undo_while_compound_open_fails() {
    let buf = DocumentBuffer::from_str("x");
    buf.insert(0, "y").unwrap();
    let guard = buf.compound_edit();
    assert_eq!(buf.undo(), Err(BufferError::CompoundEditOpen));
    assert_eq!(buf.redo(), Err(BufferError::CompoundEditOpen));
    drop(guard);
    assert_eq!(buf.undo().unwrap(), Some(0));
}

#[test]
fn test_unbalanced_end_compound_is_harmless() {
    let buf = DocumentBuffer::from_str("abc");
    buf.end_compound();
    buf.insert(0, "x").unwrap();
    assert_eq!(buf.undo().unwrap(), Some(0));
    assert_eq!(buf.text(), "abc");
}

#[test]
fn test_undo_on_read_only_document_fails() {
    let buf = DocumentBuffer::from_str("abc");
    buf.insert(0, "x").unwrap();
    buf.set_read_only(true);
    assert_eq!(buf.undo(), Err(BufferError::ReadOnly));
    assert_eq!(buf.text(), "xabc");
}

#[test]
fn test_save_point_round_trip() {
    let buf = DocumentBuffer::from_str("abc");
    assert!(!buf.is_dirty());
    buf.insert(3, "d").unwrap();
    assert!(buf.is_dirty());
    buf.undo().unwrap();
    assert!(!buf.is_dirty());
    buf.redo().unwrap();
    assert!(buf.is_dirty());
}

#[test]
fn test_save_point_lost_when_trimmed() {
    let buf = DocumentBuffer::from_str("abc");
    buf.set_undo_limit(1);
    buf.insert(0, "x").unwrap();
    buf.insert(4, "y").unwrap();
    buf.undo().unwrap();
    // The edit that left the saved state was dropped from history
    assert!(buf.is_dirty());
    assert_eq!(buf.text(), "xabc");
}

#[test]
fn test_undo_ids_group_notifications() {
    let buf = DocumentBuffer::new();
    buf.insert(0, "a").unwrap();
    let typed = buf.undo_id();
    buf.insert(1, "b").unwrap();
    assert_eq!(buf.undo_id(), typed);

    buf.insert(1, "\n").unwrap();
    assert_ne!(buf.undo_id(), typed);

    let before = buf.undo_id();
    buf.undo().unwrap();
    assert_ne!(buf.undo_id(), before);
}

#[test]
fn test_clear_history() {
    let buf = DocumentBuffer::from_str("abc");
    buf.insert(0, "x").unwrap();
    buf.clear_history();
    assert!(!buf.can_undo());
    assert_eq!(buf.text(), "xabc");
}

#[derive(Default)]
struct Kills(Mutex<Vec<String>>);

impl KillRing for Kills {
    fn add(&self, text: &str) {
        self.0.lock().push(text.to_owned());
    }

    fn changed(&self, text: &str) {
        if let Some(last) = self.0.lock().last_mut() {
            *last = text.to_owned();
        }
    }
}

#[test]
fn test_kill_ring_collects_backspaced_run() {
    let buf = DocumentBuffer::from_str("abcdef");
    let kills = Arc::new(Kills::default());
    buf.set_kill_ring(Some(kills.clone()));

    buf.insert(6, "x").unwrap();
    buf.remove(6, 1).unwrap();
    buf.remove(5, 1).unwrap();
    assert_eq!(*kills.0.lock(), vec!["fx".to_owned()]);

    buf.set_kill_ring(None);
    buf.remove(0, 1).unwrap();
    assert_eq!(kills.0.lock().len(), 1);
}
