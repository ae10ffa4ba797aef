// cnshield-core/src/text.rs
//! Byte/char offset mapping.
//!
//! The regex engine reports byte offsets, while every offset that leaves the
//! library is a char (codepoint) offset. `CharIndexMapper` converts between the
//! two for one input text.

/// Maps byte offsets of one text to char offsets and back.
#[derive(Debug, Clone)]
pub struct CharIndexMapper {
    /// Byte offset of every char, plus a trailing `text.len()` sentinel.
    /// Empty when the text is pure ASCII (offsets are identical).
    byte_offsets: Vec<usize>,
    len_bytes: usize,
}

impl CharIndexMapper {
    pub fn new(text: &str) -> Self {
        if text.is_ascii() {
            return Self { byte_offsets: Vec::new(), len_bytes: text.len() };
        }
        let mut byte_offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        byte_offsets.push(text.len());
        Self { byte_offsets, len_bytes: text.len() }
    }

    fn is_identity(&self) -> bool {
        self.byte_offsets.is_empty()
    }

    /// Number of chars in the text.
    pub fn char_len(&self) -> usize {
        if self.is_identity() {
            self.len_bytes
        } else {
            self.byte_offsets.len() - 1
        }
    }

    /// Char offset of a byte offset. Offsets inside a multi-byte char map to
    /// that char; offsets past the end map to `char_len()`.
    pub fn to_char(&self, byte: usize) -> usize {
        if self.is_identity() {
            return byte.min(self.len_bytes);
        }
        match self.byte_offsets.binary_search(&byte) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1).min(self.char_len()),
        }
    }

    /// Byte offset of a char offset, clamped to the text length.
    pub fn to_byte(&self, char_idx: usize) -> usize {
        if self.is_identity() {
            return char_idx.min(self.len_bytes);
        }
        self.byte_offsets
            .get(char_idx)
            .copied()
            .unwrap_or(self.len_bytes)
    }
}

/// Slices `text` by char offsets `[start, end)`, clamping out-of-range bounds.
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    let mapper = CharIndexMapper::new(text);
    let (s, e) = (mapper.to_byte(start), mapper.to_byte(end));
    if s >= e {
        ""
    } else {
        &text[s..e]
    }
}
