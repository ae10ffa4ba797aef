// cnshield-context/src/window/mod.rs
//! Char-bounded windows around a byte span.
//!
//! Spans are addressed by byte offsets (what the regex engines report) while
//! window radii are counted in chars, so CJK text gets the same reach as ASCII.

/// Returns the slice of at most `radius` chars ending at byte offset `start`.
pub fn before(text: &str, start: usize, radius: usize) -> &str {
    let start = floor_boundary(text, start);
    if radius == 0 || start == 0 {
        return "";
    }
    let head = &text[..start];
    match head.char_indices().rev().nth(radius - 1) {
        Some((idx, _)) => &head[idx..],
        None => head,
    }
}

/// Returns the slice of at most `radius` chars starting at byte offset `end`.
pub fn after(text: &str, end: usize, radius: usize) -> &str {
    let end = floor_boundary(text, end);
    let tail = &text[end..];
    match tail.char_indices().nth(radius) {
        Some((idx, _)) => &tail[..idx],
        None => tail,
    }
}

/// Clamps `idx` into `text` and walks back to the nearest char boundary.
fn floor_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
