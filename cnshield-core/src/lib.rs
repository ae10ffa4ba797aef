// cnshield-core/src/lib.rs
//! # cnshield Core Library
//!
//! `cnshield-core` detects, scores and masks China-specific personal and
//! secret data in free text. It combines regex recognizers with structural
//! validators (ID and credit-code checksums, Luhn), context-word boosts, an
//! optional statistical entity recognizer, a three-way decision gate and an
//! optional verifier for the uncertain band.
//!
//! ## Modules
//!
//! * `entity`: The canonical entity taxonomy.
//! * `rules`: Rule definitions, the embedded builtin catalog and YAML rule files.
//! * `validators`: Checksum and format validators per entity type.
//! * `recognizers`: Rule compilation and the pattern and statistical recognizers.
//! * `registry`: Copy-on-write registry snapshots and rule management.
//! * `merge`: Same-type overlap resolution.
//! * `scoring`: Thresholds and the decision gate.
//! * `verifier`: Verifier backends and the verification gate.
//! * `anonymizer`: Per-type mask rules and offset-safe rewriting.
//! * `analyzer`: The end-to-end request pipeline.
//! * `documents`: Text, CSV/TSV and JSON ingestion with source locations.
//! * `report`: Per-file findings, risk scoring and scan statistics.
//! * `headless`: Blocking one-shot wrappers.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cnshield_core::{AnalyzeOptions, Analyzer, EngineSettings, RecognizerRegistry};
//!
//! # async fn run() -> Result<(), cnshield_core::ShieldError> {
//! let registry = Arc::new(RecognizerRegistry::new(EngineSettings::default())?);
//! let analyzer = Analyzer::new(registry);
//!
//! let out = analyzer.anonymize("联系电话 13812345678", &AnalyzeOptions::default()).await?;
//! assert_eq!(out.text, "联系电话 138****5678");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Fallible public operations return [`ShieldError`]. Only input errors and
//! rule or configuration errors are returned from analysis and rule
//! management; validator, pattern, model and verifier failures are logged and
//! recovered inside the pipeline.
//!
//! ---
//! License: MIT OR APACHE 2.0

pub mod analyzer;
pub mod anonymizer;
pub mod config;
pub mod documents;
pub mod entity;
pub mod errors;
pub mod filters;
pub mod headless;
pub mod merge;
pub mod metrics;
pub mod recognizers;
pub mod registry;
pub mod report;
pub mod rules;
pub mod scoring;
pub mod span;
pub mod text;
pub mod validators;
pub mod verifier;

pub use analyzer::{AnalysisReport, AnalysisStats, AnalyzeOptions, Analyzer, AnonymizedText};
pub use anonymizer::{anonymize, is_length_changing, mask_value, MaskedSpan, DEFAULT_FILLER};
pub use config::{
    default_config_path, default_rules_path, DocumentConfig, EngineSettings, ValidatorFailurePolicy, VerifierConfig, VerifierMode,
};
pub use documents::{DocumentKind, DocumentScanner, Location};
pub use entity::EntityType;
pub use errors::ShieldError;
pub use filters::FalsePositiveFilter;
pub use headless::{headless_analyze, headless_anonymize, headless_anonymize_string};
pub use merge::resolve_overlaps;
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use recognizers::{EntityExtractor, RawEntity, Recognizer};
pub use registry::{RecognizerRegistry, RegistryBuilder, RegistrySnapshot};
pub use report::{entity_weight, FileReport, Finding, RiskLevel, RiskSummary, ScanReport, ScanStatistics};
pub use rules::{merge_rules, PatternDefinition, RuleDefinition, RuleSource, RuleStore, MAX_PATTERN_LENGTH};
pub use scoring::{Decision, ScoringPolicy};
pub use span::{redact_sensitive, CandidateSpan, ResolvedResult, SpanOrigin};
pub use validators::{Validation, ValidatorKind};
pub use verifier::{LocalModel, MockVerifier, Verdict, VerificationRequest, Verifier};
