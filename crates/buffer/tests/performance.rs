// Chunk: docs/chunks/line_index - Gap-line optimized line end index

//! Performance sanity checks for the document model.
//!
//! These tests verify that basic operations complete within reasonable time bounds.
//! They are not formal benchmarks but guard against obvious performance regressions
//! (an edit that rewrites every line record or moves the whole text).
//! Bounds are loose enough for unoptimized debug builds.

use quill_buffer::{DocumentBuffer, LoadedText};
use std::time::{Duration, Instant};

fn many_lines(count: usize) -> String {
    (0..count)
        .map(|i| format!("Line number {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn typing_20k_chars_under_2s() {
    let buffer = DocumentBuffer::new();
    let start = Instant::now();

    for i in 0..20_000 {
        let text = if i % 80 == 79 { "\n" } else { "x" };
        buffer.insert(i, text).unwrap();
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_secs(2),
        "Typing 20K characters took {:?}, expected < 2s",
        elapsed
    );
    assert_eq!(buffer.len(), 20_000);
    assert_eq!(buffer.line_count(), 251);
}

#[test]
fn typing_at_top_of_large_document() {
    // Every edit shifts all later lines; the gap line makes that O(1) per edit
    let buffer = DocumentBuffer::from_str(&many_lines(20_000));
    let start = Instant::now();

    for i in 0..5_000 {
        buffer.insert(i, "y").unwrap();
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_secs(2),
        "5K edits at the top of a 20K-line document took {:?}, expected < 2s",
        elapsed
    );
    assert_eq!(buffer.line_text(0).unwrap().len(), 5_000 + "Line number 0".len());
    assert_eq!(buffer.line_text(19_999).unwrap(), "Line number 19999");
}

#[test]
fn line_access_performance() {
    let buffer = DocumentBuffer::from_str(&many_lines(1000));
    let start = Instant::now();

    // Access each line many times under one read lock
    let doc = buffer.read();
    for _ in 0..100 {
        for line in 0..doc.line_count() {
            let _ = doc.line_text(line).unwrap();
        }
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_millis(500),
        "Accessing {} lines 100 times took {:?}, expected < 500ms",
        doc.line_count(),
        elapsed
    );
}

#[test]
fn line_of_offset_is_logarithmic() {
    let buffer = DocumentBuffer::from_str(&many_lines(100_000));
    let len = buffer.len();
    let start = Instant::now();

    let doc = buffer.read();
    for i in 0..100_000 {
        let _ = doc.line_of_offset((i * 7919) % len).unwrap();
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_millis(500),
        "100K line lookups took {:?}, expected < 500ms",
        elapsed
    );
}

#[test]
fn delete_all_chars_performance() {
    let buffer = DocumentBuffer::from_str(&"x".repeat(10_000));
    let start = Instant::now();

    // Delete all characters via backspace
    while !buffer.is_empty() {
        buffer.remove(buffer.len() - 1, 1).unwrap();
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_secs(1),
        "Deleting 10K characters took {:?}, expected < 1s",
        elapsed
    );
    // Backspacing merges into a single history entry
    assert_eq!(buffer.undo().unwrap(), Some(10_000));
    assert_eq!(buffer.len(), 10_000);
}

#[test]
fn bulk_load_megabyte_document() {
    let text = many_lines(80_000);
    let start = Instant::now();

    let buffer = DocumentBuffer::new();
    buffer.load(LoadedText::from(text.as_str()));

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_secs(2),
        "Loading {} chars took {:?}, expected < 2s",
        text.len(),
        elapsed
    );
    assert_eq!(buffer.line_count(), 80_000);
}

#[test]
fn many_positions_survive_edits() {
    let buffer = DocumentBuffer::from_str(&"x".repeat(20_000));
    let positions: Vec<_> = (0..20_000)
        .step_by(4)
        .map(|offset| buffer.create_position(offset).unwrap())
        .collect();
    let start = Instant::now();

    // Edits near the end only touch the positions after them
    for _ in 0..2_000 {
        buffer.insert(19_990, "y").unwrap();
    }

    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_secs(1),
        "2K edits with 5K live positions took {:?}, expected < 1s",
        elapsed
    );
    assert_eq!(positions[0].offset(), 0);
    assert_eq!(positions.last().unwrap().offset(), 19_996 + 2_000);
}
