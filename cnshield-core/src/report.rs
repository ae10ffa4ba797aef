// cnshield-core/src/report.rs
//! Scan reports: per-file findings, statistics and an overall risk rating.
//!
//! Each finding adds `floor(weight × score)` to the risk score, where the
//! weight reflects how damaging a leak of that entity type is. The sum is
//! capped at 100 and mapped to a [`RiskLevel`]. Per-type [`RiskSummary`]
//! entries list the affected files, most severe first.
//!
//! Reports carry masked values and sample hashes, never raw matches.
//!
//! License: MIT OR APACHE 2.0

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

use crate::documents::Location;
use crate::entity::EntityType;
use crate::errors::ShieldError;
use crate::span::ResolvedResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        if score >= 80 {
            RiskLevel::Critical
        } else if score >= 60 {
            RiskLevel::High
        } else if score >= 40 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// The level of one entity type on its own.
    pub fn of_type(entity_type: &EntityType) -> Self {
        match entity_type {
            EntityType::IdCard
            | EntityType::BankCard
            | EntityType::Passport
            | EntityType::SensitiveField
            | EntityType::CloudKey => RiskLevel::High,
            EntityType::Phone | EntityType::Jwt | EntityType::JdbcConnection | EntityType::Person => {
                RiskLevel::Medium
            }
            _ => RiskLevel::Low,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        })
    }
}

/// Risk weight of one finding of this type at score 1.0.
pub fn entity_weight(entity_type: &EntityType) -> u32 {
    match entity_type {
        EntityType::IdCard | EntityType::BankCard | EntityType::SensitiveField => 10,
        EntityType::CloudKey => 9,
        EntityType::Passport | EntityType::MilitaryId | EntityType::JdbcConnection => 8,
        EntityType::Jwt => 7,
        EntityType::DriverLicense => 6,
        EntityType::Phone | EntityType::SocialCreditCode => 5,
        EntityType::Person => 4,
        EntityType::Email => 3,
        _ => 2,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub entity_type: EntityType,
    pub score: f64,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_reason: Option<String>,
    pub recognizer: String,
    /// The value with its type's mask applied.
    pub masked: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_hash: Option<String>,
    pub location: Location,
}

impl Finding {
    pub fn new(result: ResolvedResult, masked: String, location: Location) -> Self {
        Self {
            entity_type: result.entity_type,
            score: result.score,
            verified: result.verified,
            verification_reason: result.verification_reason,
            recognizer: result.recognizer,
            masked,
            sample_hash: result.sample_hash,
            location,
        }
    }
}

/// The outcome of scanning one file. A file with `error` set was not scanned
/// (or not completely) and carries no findings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: String,
    /// Lower-case extension, or "unknown".
    pub file_type: String,
    pub size: u64,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl FileReport {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        let file_type = Path::new(&path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "unknown".to_string());
        Self { path, file_type, size, findings: Vec::new(), error: None, elapsed_ms: 0 }
    }

    pub fn failed(path: impl Into<String>, size: u64, error: impl fmt::Display) -> Self {
        let mut report = Self::new(path, size);
        report.error = Some(error.to_string());
        report
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSummary {
    pub level: RiskLevel,
    pub entity_type: EntityType,
    pub count: usize,
    /// `count × weight`.
    pub score: u32,
    pub affected_files: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanStatistics {
    pub total_files: usize,
    pub processed_files: usize,
    pub failed_files: usize,
    pub total_findings: usize,
    pub by_entity_type: BTreeMap<String, usize>,
    pub by_file_type: BTreeMap<String, usize>,
    /// Over processed files.
    pub avg_findings_per_file: f64,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub report_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub risk_summaries: Vec<RiskSummary>,
    pub statistics: ScanStatistics,
    pub files: Vec<FileReport>,
}

impl ScanReport {
    pub fn from_files(files: Vec<FileReport>) -> Self {
        let risk_score = risk_score(&files);
        let report = Self {
            report_id: Uuid::new_v4(),
            created_at: Utc::now(),
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            risk_summaries: risk_summaries(&files),
            statistics: statistics(&files),
            files,
        };
        info!(
            "Scan report {}: {} finding(s) in {} file(s), risk {} ({}/100).",
            report.report_id,
            report.statistics.total_findings,
            report.statistics.total_files,
            report.risk_level,
            report.risk_score
        );
        report
    }

    pub fn findings(&self) -> impl Iterator<Item = (&FileReport, &Finding)> {
        self.files.iter().flat_map(|file| file.findings.iter().map(move |f| (file, f)))
    }

    pub fn to_json(&self) -> Result<String, ShieldError> {
        serde_json::to_string_pretty(self).map_err(|e| ShieldError::Serialization(e.to_string()))
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ShieldError> {
        let mut json = self.to_json()?;
        json.push('\n');
        std::fs::write(path.as_ref(), json)?;
        info!("Scan report written to {}.", path.as_ref().display());
        Ok(())
    }
}

fn risk_score(files: &[FileReport]) -> u32 {
    let total: u32 = files
        .iter()
        .flat_map(|f| &f.findings)
        .map(|f| (f64::from(entity_weight(&f.entity_type)) * f.score).floor() as u32)
        .sum();
    total.min(100)
}

fn risk_summaries(files: &[FileReport]) -> Vec<RiskSummary> {
    let mut by_type: BTreeMap<&EntityType, (usize, BTreeSet<&str>)> = BTreeMap::new();
    for file in files {
        for finding in &file.findings {
            let entry = by_type.entry(&finding.entity_type).or_default();
            entry.0 += 1;
            entry.1.insert(&file.path);
        }
    }

    let mut summaries: Vec<RiskSummary> = by_type
        .into_iter()
        .map(|(entity_type, (count, affected))| {
            let level = RiskLevel::of_type(entity_type);
            RiskSummary {
                level,
                entity_type: entity_type.clone(),
                count,
                score: count as u32 * entity_weight(entity_type),
                affected_files: affected.into_iter().map(str::to_string).collect(),
                description: format!("{count} {level}-risk {entity_type} finding(s)"),
            }
        })
        .collect();
    summaries.sort_by(|a, b| b.level.cmp(&a.level).then(b.score.cmp(&a.score)));
    summaries
}

fn statistics(files: &[FileReport]) -> ScanStatistics {
    let mut stats = ScanStatistics { total_files: files.len(), ..ScanStatistics::default() };
    for file in files {
        if file.is_ok() {
            stats.processed_files += 1;
        } else {
            stats.failed_files += 1;
        }
        *stats.by_file_type.entry(file.file_type.clone()).or_default() += 1;
        stats.total_findings += file.findings.len();
        stats.elapsed_ms += file.elapsed_ms;
        for finding in &file.findings {
            *stats.by_entity_type.entry(finding.entity_type.to_string()).or_default() += 1;
        }
    }
    if stats.processed_files > 0 {
        stats.avg_findings_per_file = stats.total_findings as f64 / stats.processed_files as f64;
    }
    stats
}
