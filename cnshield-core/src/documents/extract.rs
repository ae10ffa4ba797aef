// cnshield-core/src/documents/extract.rs
//! Format-specific chunking.
//!
//! A [`Chunk`] is the text of one analyzer request plus the [`Segment`]s it
//! was assembled from. Text between segments (row breaks, cell separators,
//! JSON key prefixes) belongs to no segment; spans starting there are not
//! reported.

use log::{debug, warn};
use serde_json::Value;

use crate::documents::{DocumentKind, Location};
use crate::errors::ShieldError;

/// Where the first char of a segment came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// `offset` chars into the decoded file, at `line`:`column`.
    Text { offset: usize, line: usize, column: usize },
    Cell { row: usize, column: usize },
    Json { line: Option<usize>, pointer: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Char range in the chunk text.
    pub start: usize,
    pub end: usize,
    pub origin: Origin,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    text: String,
    chars: usize,
    /// Char offsets of every '\n' in `text`.
    newlines: Vec<usize>,
    segments: Vec<Segment>,
}

impl Chunk {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn push_str(&mut self, s: &str) {
        for c in s.chars() {
            if c == '\n' {
                self.newlines.push(self.chars);
            }
            self.chars += 1;
        }
        self.text.push_str(s);
    }

    fn push_segment(&mut self, value: &str, origin: Origin) {
        let start = self.chars;
        self.push_str(value);
        self.segments.push(Segment { start, end: self.chars, origin });
    }

    /// The chunk text in the char range `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> String {
        self.text.chars().skip(start).take(end.saturating_sub(start)).collect()
    }

    /// Maps a char span of the chunk back to the source. The span is clipped
    /// to the segment it starts in.
    pub fn locate(&self, start: usize, end: usize) -> Option<Location> {
        let idx = self.segments.partition_point(|s| s.end <= start);
        let segment = self.segments.get(idx).filter(|s| s.start <= start)?;
        let rel_start = start - segment.start;
        let rel_end = end.min(segment.end).saturating_sub(segment.start);

        Some(match &segment.origin {
            Origin::Text { offset, line, column } => {
                let before = self.newlines.partition_point(|&p| p < segment.start);
                let upto = self.newlines.partition_point(|&p| p < start);
                let (line, column) = match upto.checked_sub(1).filter(|&last| last >= before) {
                    Some(last) => (line + (upto - before), start - self.newlines[last]),
                    None => (*line, column + rel_start),
                };
                Location::Text { line, column, start: offset + rel_start, end: offset + rel_end }
            }
            Origin::Cell { row, column } => Location::Cell { row: *row, column: *column, start: rel_start, end: rel_end },
            Origin::Json { line, pointer } => Location::Json {
                line: *line,
                pointer: pointer.clone(),
                start: rel_start,
                end: rel_end,
            },
        })
    }
}

/// Splits `text` by format into chunks of at most `max_chars` chars.
/// A single CSV row or JSON value longer than `max_chars` stays whole.
pub fn extract(kind: DocumentKind, text: &str, max_chars: usize) -> Result<Vec<Chunk>, ShieldError> {
    let max_chars = max_chars.max(1);
    match kind {
        DocumentKind::Text => Ok(text_chunks(text, max_chars)),
        DocumentKind::Csv => delimited_chunks(text, b',', max_chars),
        DocumentKind::Tsv => delimited_chunks(text, b'\t', max_chars),
        DocumentKind::Json => json_chunks(text, max_chars),
        DocumentKind::JsonLines => Ok(json_lines_chunks(text, max_chars)),
    }
}

/// Splits after `n` chars.
fn split_at_char(s: &str, n: usize) -> (&str, &str) {
    match s.char_indices().nth(n) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, ""),
    }
}

/// Cuts on line boundaries. Lines longer than `max_chars` are cut inside the line.
pub fn text_chunks(text: &str, max_chars: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut body = String::new();
    let mut body_chars = 0;
    let mut origin = Origin::Text { offset: 0, line: 1, column: 1 };
    let (mut offset, mut line) = (0, 1);

    let mut flush = |body: &mut String, body_chars: &mut usize, origin: &Origin| {
        let mut chunk = Chunk::default();
        chunk.push_segment(body, origin.clone());
        chunks.push(chunk);
        body.clear();
        *body_chars = 0;
    };

    for raw_line in text.split_inclusive('\n') {
        let n = raw_line.chars().count();
        if body_chars > 0 && body_chars + n > max_chars {
            flush(&mut body, &mut body_chars, &origin);
        }
        let mut rest = raw_line;
        let mut column = 1;
        loop {
            if body_chars == 0 {
                origin = Origin::Text { offset, line, column };
            }
            let (head, tail) = split_at_char(rest, max_chars - body_chars);
            let taken = head.chars().count();
            body.push_str(head);
            body_chars += taken;
            offset += taken;
            column += taken;
            rest = tail;
            if rest.is_empty() {
                break;
            }
            flush(&mut body, &mut body_chars, &origin);
        }
        line += 1;
    }
    if body_chars > 0 {
        flush(&mut body, &mut body_chars, &origin);
    }
    chunks
}

/// One segment per non-empty cell; cells are joined with ' ' and rows with '\n'.
pub fn delimited_chunks(text: &str, delimiter: u8, max_chars: usize) -> Result<Vec<Chunk>, ShieldError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut chunks = Vec::new();
    let mut current = Chunk::default();
    for (idx, record) in reader.records().enumerate() {
        let row = idx + 1;
        let record = record.map_err(|e| ShieldError::Document(format!("row {row}: {e}")))?;
        let row_chars: usize = record.iter().map(|cell| cell.chars().count() + 1).sum();
        if !current.is_empty() && current.len() + row_chars > max_chars {
            chunks.push(std::mem::take(&mut current));
        }

        let mut first = true;
        for (col, cell) in record.iter().enumerate().filter(|(_, cell)| !cell.trim().is_empty()) {
            if first && !current.is_empty() {
                current.push_str("\n");
            } else if !first {
                current.push_str(" ");
            }
            first = false;
            current.push_segment(cell, Origin::Cell { row, column: col + 1 });
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    debug!("Read {} delimited chunk(s).", chunks.len());
    Ok(chunks)
}

/// A string or number in a JSON document.
struct Leaf {
    pointer: String,
    key: Option<String>,
    value: String,
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn collect_leaves(value: &Value, pointer: String, key: Option<&str>, out: &mut Vec<Leaf>) {
    match value {
        Value::String(s) if !s.trim().is_empty() => {
            out.push(Leaf { pointer, key: key.map(str::to_string), value: s.clone() })
        }
        Value::Number(n) => out.push(Leaf { pointer, key: key.map(str::to_string), value: n.to_string() }),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_leaves(item, format!("{pointer}/{i}"), key, out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                collect_leaves(v, format!("{pointer}/{}", escape_pointer(k)), Some(k), out);
            }
        }
        _ => {}
    }
}

/// Each leaf becomes a `key: value` line. The key is there as context for
/// the value and is not itself reported.
fn pack_leaves(leaves: Vec<Leaf>, line: Option<usize>, max_chars: usize, chunks: &mut Vec<Chunk>, current: &mut Chunk) {
    for leaf in leaves {
        let prefix = leaf.key.as_deref().map(|k| format!("{k}: ")).unwrap_or_default();
        let leaf_chars = prefix.chars().count() + leaf.value.chars().count() + 1;
        if !current.is_empty() && current.len() + leaf_chars > max_chars {
            chunks.push(std::mem::take(current));
        }
        if !current.is_empty() {
            current.push_str("\n");
        }
        current.push_str(&prefix);
        current.push_segment(&leaf.value, Origin::Json { line, pointer: leaf.pointer });
    }
}

pub fn json_chunks(text: &str, max_chars: usize) -> Result<Vec<Chunk>, ShieldError> {
    let value: Value = serde_json::from_str(text).map_err(|e| ShieldError::Document(format!("invalid JSON: {e}")))?;
    let mut leaves = Vec::new();
    collect_leaves(&value, String::new(), None, &mut leaves);

    let (mut chunks, mut current) = (Vec::new(), Chunk::default());
    pack_leaves(leaves, None, max_chars, &mut chunks, &mut current);
    if !current.is_empty() {
        chunks.push(current);
    }
    Ok(chunks)
}

/// Lines that are not valid JSON are skipped with a warning.
pub fn json_lines_chunks(text: &str, max_chars: usize) -> Vec<Chunk> {
    let (mut chunks, mut current) = (Vec::new(), Chunk::default());
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Skipping JSON line {}: {}", idx + 1, e);
                continue;
            }
        };
        let mut leaves = Vec::new();
        collect_leaves(&value, String::new(), None, &mut leaves);
        pack_leaves(leaves, Some(idx + 1), max_chars, &mut chunks, &mut current);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(chunk: &Chunk, needle: &str) -> (usize, usize) {
        let byte = chunk.text().find(needle).unwrap();
        let start = chunk.text()[..byte].chars().count();
        (start, start + needle.chars().count())
    }

    #[test]
    fn test_text_chunks_keep_lines_whole() {
        let text = "第一行\n联系电话13812345678\n末行";
        let chunks = text_chunks(text, 18);
        let joined: String = chunks.iter().map(Chunk::text).collect();
        assert_eq!(joined, text);
        assert!(chunks.iter().all(|c| c.len() <= 18));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text(), "联系电话13812345678\n末行");

        let (start, end) = find(&chunks[1], "13812345678");
        assert_eq!(
            chunks[1].locate(start, end),
            Some(Location::Text { line: 2, column: 5, start: 8, end: 19 })
        );
        let (start, end) = find(&chunks[1], "末行");
        assert_eq!(
            chunks[1].locate(start, end),
            Some(Location::Text { line: 3, column: 1, start: 20, end: 22 })
        );
    }

    #[test]
    fn test_long_line_is_cut_with_running_columns() {
        let text = format!("{}\nab", "x".repeat(25));
        let chunks = text_chunks(&text, 10);
        let lens: Vec<_> = chunks.iter().map(Chunk::len).collect();
        assert_eq!(lens, vec![10, 10, 8]);
        assert_eq!(chunks[2].text(), "xxxxx\nab");
        assert_eq!(chunks[2].locate(0, 1), Some(Location::Text { line: 1, column: 21, start: 20, end: 21 }));
        assert_eq!(chunks[2].locate(6, 8), Some(Location::Text { line: 2, column: 1, start: 26, end: 28 }));
    }

    #[test]
    fn test_csv_cells_map_back() {
        let text = "姓名,手机,备注\n张三,13812345678,\"含,逗号\"\n李四,,13912345678\n";
        let chunks = delimited_chunks(text, b',', 1_000).unwrap();
        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.text(), "姓名 手机 备注\n张三 13812345678 含,逗号\n李四 13912345678");

        let (start, end) = find(chunk, "13912345678");
        assert_eq!(chunk.locate(start, end), Some(Location::Cell { row: 3, column: 3, start: 0, end: 11 }));
        let (start, _) = find(chunk, "13812345678");
        assert_eq!(chunk.locate(start + 3, start + 11), Some(Location::Cell { row: 2, column: 2, start: 3, end: 11 }));
        // The separator between cells belongs to no cell.
        assert_eq!(chunk.locate(start - 1, start + 11), None);
    }

    #[test]
    fn test_csv_rows_are_batched_under_the_limit() {
        let text = "a,b\nc,d\ne,f\n";
        let chunks = delimited_chunks(text, b',', 8).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text(), "a b\nc d");
        assert_eq!(chunks[1].text(), "e f");
    }

    #[test]
    fn test_tsv_uses_tabs() {
        let chunks = extract(DocumentKind::Tsv, "k\tzhangsan@qq.com\n", 100).unwrap();
        let (start, end) = find(&chunks[0], "zhangsan@qq.com");
        assert_eq!(chunks[0].locate(start, end), Some(Location::Cell { row: 1, column: 2, start: 0, end: 15 }));
    }

    #[test]
    fn test_json_values_carry_pointers() {
        let text = r#"{"user": {"手机号": "13812345678", "tags": ["a/b", 6212260200012345670]}, "ok": true}"#;
        let chunks = json_chunks(text, 1_000).unwrap();
        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert!(chunk.text().contains("手机号: 13812345678"));

        let (start, end) = find(chunk, "13812345678");
        assert_eq!(
            chunk.locate(start, end),
            Some(Location::Json { line: None, pointer: "/user/手机号".into(), start: 0, end: 11 })
        );
        let (start, end) = find(chunk, "6212260200012345670");
        assert_eq!(
            chunk.locate(start, end),
            Some(Location::Json { line: None, pointer: "/user/tags/1".into(), start: 0, end: 19 })
        );
        // Keys are context only.
        let (start, end) = find(chunk, "手机号");
        assert_eq!(chunk.locate(start, end), None);
    }

    #[test]
    fn test_invalid_json_is_a_document_error() {
        assert!(matches!(json_chunks("{not json", 100), Err(ShieldError::Document(_))));
    }

    #[test]
    fn test_json_lines_skip_bad_lines() {
        let text = "{\"phone\": \"13812345678\"}\nnot json\n\n{\"mail\": \"li@163.com\"}\n";
        let chunks = json_lines_chunks(text, 1_000);
        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        let (start, end) = find(chunk, "li@163.com");
        assert_eq!(
            chunk.locate(start, end),
            Some(Location::Json { line: Some(4), pointer: "/mail".into(), start: 0, end: 10 })
        );
    }

    #[test]
    fn test_pointer_escaping() {
        let chunks = json_chunks(r#"{"a/b": {"c~d": "x"}}"#, 100).unwrap();
        assert_eq!(
            chunks[0].segments()[0].origin,
            Origin::Json { line: None, pointer: "/a~1b/c~0d".into() }
        );
    }
}
