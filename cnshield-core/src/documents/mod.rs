// cnshield-core/src/documents/mod.rs
//! Document ingestion.
//!
//! Plain text, CSV/TSV and JSON/JSON Lines files are split into chunks that
//! fit one analyzer request. Each chunk remembers which line, cell or JSON
//! value every part of its text came from, so findings are reported against
//! the source document rather than the chunk.
//!
//! * `extract`: format-specific chunking and offset tracking.
//! * `scanner`: file, byte buffer and directory scans.
//!
//! License: MIT OR APACHE 2.0

pub mod extract;
pub mod scanner;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub use extract::{Chunk, Origin, Segment};
pub use scanner::DocumentScanner;

/// A file format the scanner can read, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Text,
    Csv,
    Tsv,
    Json,
    JsonLines,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "log" | "md" | "rst" | "ini" | "conf" | "cfg" => Some(DocumentKind::Text),
            "csv" => Some(DocumentKind::Csv),
            "tsv" => Some(DocumentKind::Tsv),
            "json" => Some(DocumentKind::Json),
            "jsonl" | "ndjson" => Some(DocumentKind::JsonLines),
            _ => None,
        }
    }
}

/// Where a finding sits in its source document.
///
/// `Text` offsets are char offsets into the decoded file. `Cell` and `Json`
/// offsets are char offsets into the cell or string value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    Text { line: usize, column: usize, start: usize, end: usize },
    Cell { row: usize, column: usize, start: usize, end: usize },
    Json {
        #[serde(skip_serializing_if = "Option::is_none")]
        line: Option<usize>,
        pointer: String,
        start: usize,
        end: usize,
    },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Text { line, column, .. } => write!(f, "line {line}:{column}"),
            Location::Cell { row, column, .. } => write!(f, "row {row}, column {column}"),
            Location::Json { line: Some(line), pointer, .. } => write!(f, "line {line} {pointer}"),
            Location::Json { line: None, pointer, .. } if pointer.is_empty() => f.write_str("/"),
            Location::Json { line: None, pointer, .. } => f.write_str(pointer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_by_extension() {
        assert_eq!(DocumentKind::from_path(Path::new("a/b/app.LOG")), Some(DocumentKind::Text));
        assert_eq!(DocumentKind::from_path(Path::new("users.csv")), Some(DocumentKind::Csv));
        assert_eq!(DocumentKind::from_path(Path::new("users.tsv")), Some(DocumentKind::Tsv));
        assert_eq!(DocumentKind::from_path(Path::new("events.jsonl")), Some(DocumentKind::JsonLines));
        assert_eq!(DocumentKind::from_path(Path::new("report.pdf")), None);
        assert_eq!(DocumentKind::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_location_labels() {
        let text = Location::Text { line: 3, column: 7, start: 40, end: 51 };
        assert_eq!(text.to_string(), "line 3:7");
        let json = Location::Json { line: Some(2), pointer: "/user/phone".into(), start: 0, end: 11 };
        assert_eq!(json.to_string(), "line 2 /user/phone");

        let value = serde_json::to_value(&text).unwrap();
        assert_eq!(value["kind"], "text");
        assert_eq!(value["line"], 3);
    }
}
