// cnshield-core/src/documents/scanner.rs
//! File, buffer and directory scans.
//!
//! Contents are decoded as UTF-8 (invalid sequences replaced, a leading BOM
//! dropped), chunked by format on the blocking pool and analyzed chunk by
//! chunk. Directory scans walk the tree with `walkdir`, keep only files with
//! a supported extension and scan up to `documents.max_workers` of them at
//! once. A file that cannot be read, parsed or analyzed yields a
//! [`FileReport`] carrying the error; it never aborts the scan.
//!
//! License: MIT OR APACHE 2.0

use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::analyzer::{AnalyzeOptions, Analyzer};
use crate::anonymizer::mask_value;
use crate::config::DocumentConfig;
use crate::documents::{extract, DocumentKind};
use crate::errors::ShieldError;
use crate::report::{FileReport, Finding};

#[derive(Clone)]
pub struct DocumentScanner {
    analyzer: Analyzer,
    options: AnalyzeOptions,
    config: DocumentConfig,
}

fn decode(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text.into_owned(),
    }
}

/// Supported files under `root`, in file-name order.
fn collect_files(root: &Path, recursive: bool) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }
    walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable directory entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let supported = DocumentKind::from_path(path).is_some();
            if !supported {
                debug!("Skipping unsupported file {}", path.display());
            }
            supported
        })
        .collect()
}

impl DocumentScanner {
    /// A scanner using the registry's live `documents` settings.
    pub fn new(analyzer: Analyzer) -> Self {
        let config = analyzer.registry().settings().documents.clone();
        Self { analyzer, options: AnalyzeOptions::default(), config }
    }

    pub fn with_options(mut self, options: AnalyzeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_config(mut self, config: DocumentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// Scans in-memory contents. `name` picks the format by its extension.
    pub async fn scan_bytes(&self, name: &str, data: &[u8]) -> FileReport {
        let started = Instant::now();
        let mut report = FileReport::new(name, data.len() as u64);
        match self.findings_in(name, data).await {
            Ok(findings) => report.findings = findings,
            Err(e) => {
                warn!("Could not scan {}: {}", name, e);
                report.error = Some(e.to_string());
            }
        }
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        debug!("Scanned {} in {} ms: {} finding(s).", name, report.elapsed_ms, report.findings.len());
        report
    }

    pub async fn scan_file(&self, path: &Path) -> FileReport {
        let name = path.display().to_string();
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(e) => return FileReport::failed(name, 0, e),
        };
        if size > self.config.max_file_bytes {
            warn!("Skipping {}: {} bytes exceeds the limit of {}.", name, size, self.config.max_file_bytes);
            return FileReport::failed(
                name,
                size,
                format!("file is {} bytes, over the limit of {}", size, self.config.max_file_bytes),
            );
        }
        match tokio::fs::read(path).await {
            Ok(data) => self.scan_bytes(&name, &data).await,
            Err(e) => FileReport::failed(name, size, e),
        }
    }

    /// Scans one file, or every supported file in a directory. Reports come
    /// back in walk order.
    pub async fn scan_path(&self, root: &Path) -> Result<Vec<FileReport>, ShieldError> {
        let meta = tokio::fs::metadata(root).await?;
        if !meta.is_dir() {
            return Ok(vec![self.scan_file(root).await]);
        }

        let (walk_root, recursive) = (root.to_path_buf(), self.config.recursive);
        let files = tokio::task::spawn_blocking(move || collect_files(&walk_root, recursive))
            .await
            .map_err(|e| ShieldError::Document(format!("directory walk failed: {e}")))?;
        info!("Scanning {} file(s) under {}.", files.len(), root.display());

        let permits = Arc::new(Semaphore::new(self.config.max_workers));
        let mut tasks = JoinSet::new();
        for (idx, path) in files.iter().cloned().enumerate() {
            let scanner = self.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                (idx, scanner.scan_file(&path).await)
            });
        }

        let mut slots: Vec<Option<FileReport>> = vec![None; files.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, report)) => slots[idx] = Some(report),
                Err(e) => warn!("File scan task ended abnormally: {}", e),
            }
        }
        Ok(files
            .into_iter()
            .zip(slots)
            .map(|(path, slot)| slot.unwrap_or_else(|| FileReport::failed(path.display().to_string(), 0, "scan task failed")))
            .collect())
    }

    async fn findings_in(&self, name: &str, data: &[u8]) -> Result<Vec<Finding>, ShieldError> {
        let kind = DocumentKind::from_path(Path::new(name))
            .ok_or_else(|| ShieldError::Document(format!("unsupported file type: {name}")))?;
        if data.len() as u64 > self.config.max_file_bytes {
            return Err(ShieldError::Document(format!(
                "file is {} bytes, over the limit of {}",
                data.len(),
                self.config.max_file_bytes
            )));
        }

        let snapshot = self.analyzer.registry().snapshot();
        let max_chars = self.config.chunk_chars.min(snapshot.settings.limits.max_input_chars);
        let filler = snapshot.settings.anonymizer.filler;

        let text = decode(data);
        let chunks = tokio::task::spawn_blocking(move || extract::extract(kind, &text, max_chars))
            .await
            .map_err(|e| ShieldError::Document(format!("extraction task failed: {e}")))??;
        debug!("{} split into {} chunk(s).", name, chunks.len());

        let mut findings = Vec::new();
        for chunk in &chunks {
            let report = self.analyzer.analyze(chunk.text(), &self.options).await?;
            for result in report.results {
                let Some(location) = chunk.locate(result.start, result.end) else {
                    debug!("Dropping a {} span that starts outside the document values.", result.entity_type);
                    continue;
                };
                let masked = mask_value(&result.entity_type, &chunk.slice(result.start, result.end), filler);
                findings.push(Finding::new(result, masked, location));
            }
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::documents::Location;
    use crate::entity::EntityType;
    use crate::registry::RecognizerRegistry;

    fn scanner() -> DocumentScanner {
        let mut settings = EngineSettings::default();
        settings.recognizers.enabled = vec!["cn_phone".into(), "cn_email".into()];
        let registry = Arc::new(RecognizerRegistry::new(settings).unwrap());
        DocumentScanner::new(Analyzer::new(registry))
    }

    #[test]
    fn test_decode_drops_bom_and_bad_bytes() {
        assert_eq!(decode("\u{feff}电话".as_bytes()), "电话");
        assert_eq!(decode(b"ab\xffcd"), "ab\u{fffd}cd");
    }

    #[tokio::test]
    async fn test_text_findings_point_into_the_file() {
        let data = "第一行没有\n客户电话13812345678\n".as_bytes();
        let report = scanner().scan_bytes("notes.txt", data).await;
        assert!(report.is_ok(), "{:?}", report.error);
        assert_eq!(report.file_type, "txt");
        assert_eq!(report.findings.len(), 1);
        let finding = &report.findings[0];
        assert_eq!(finding.entity_type, EntityType::Phone);
        assert_eq!(finding.masked, "138****5678");
        assert_eq!(finding.location, Location::Text { line: 2, column: 5, start: 10, end: 21 });
    }

    #[tokio::test]
    async fn test_small_chunks_keep_file_offsets() {
        let mut config = DocumentConfig::default();
        config.chunk_chars = 12;
        let data = "甲\n乙\n丙\n邮箱li@163.com\n".as_bytes();
        let report = scanner().with_config(config).scan_bytes("a.log", data).await;
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].location, Location::Text { line: 4, column: 3, start: 8, end: 18 });
    }

    #[tokio::test]
    async fn test_unsupported_and_oversized_are_file_errors() {
        let report = scanner().scan_bytes("photo.png", b"\x89PNG").await;
        assert!(report.error.as_deref().unwrap().contains("unsupported"));

        let mut config = DocumentConfig::default();
        config.max_file_bytes = 4;
        let report = scanner().with_config(config).scan_bytes("a.txt", b"13812345678").await;
        assert!(report.error.as_deref().unwrap().contains("over the limit"));
        assert!(report.findings.is_empty());
    }

    #[tokio::test]
    async fn test_entity_filter_applies_to_documents() {
        let data = "手机,邮箱\n13812345678,zhangsan@qq.com\n".as_bytes();
        let report = scanner()
            .with_options(AnalyzeOptions::entities([EntityType::Email]))
            .scan_bytes("people.csv", data)
            .await;
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].location, Location::Cell { row: 2, column: 2, start: 0, end: 15 });
        assert_eq!(report.findings[0].masked, "zha***@qq.com");
    }
}
