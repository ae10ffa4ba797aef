// cnshield-core/src/analyzer.rs
//! The analysis pipeline.
//!
//! One request runs against one registry snapshot:
//!
//! 1. the input size is checked against `limits.max_input_chars`;
//! 2. pattern recognizers and the statistical recognizer run concurrently on
//!    the blocking pool, the latter behind the snapshot's permit semaphore;
//! 3. statistical spans pass the false-positive filter;
//! 4. overlaps are resolved per entity type;
//! 5. the decision gate accepts, rejects or routes each span to the verifier;
//! 6. results come back sorted by `(start, end, entity_type)`.
//!
//! Dropping the future returned by [`Analyzer::analyze`] cancels outstanding
//! verifier calls. Blocking recognizer work already started runs to
//! completion and its output is discarded.
//!
//! License: MIT OR APACHE 2.0

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::anonymizer::{self, MaskedSpan};
use crate::entity::EntityType;
use crate::errors::ShieldError;
use crate::merge;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::recognizers::Recognizer;
use crate::registry::{RecognizerRegistry, RegistrySnapshot};
use crate::scoring::Decision;
use crate::span::{CandidateSpan, ResolvedResult};

/// Per-request knobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeOptions {
    /// Only report these types. Empty means every type.
    pub entities: Vec<EntityType>,
    /// `Some(false)` skips verification for this request. `None` follows settings.
    pub verify: Option<bool>,
}

impl AnalyzeOptions {
    pub fn entities<I: IntoIterator<Item = EntityType>>(entities: I) -> Self {
        Self { entities: entities.into_iter().collect(), verify: None }
    }

    fn wants(&self, entity_type: &EntityType) -> bool {
        self.entities.is_empty() || self.entities.contains(entity_type)
    }

    fn wants_any_of(&self, recognizer: &Recognizer) -> bool {
        self.entities.is_empty() || self.entities.iter().any(|e| recognizer.supports(e))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisStats {
    pub input_chars: usize,
    /// Candidate spans from all recognizers, after the false-positive filter.
    pub candidates: usize,
    /// Spans left after overlap resolution.
    pub merged: usize,
    pub accepted: usize,
    pub below_threshold: usize,
    pub sent_to_verifier: usize,
    pub verifier_confirmed: usize,
    pub verifier_rejected: usize,
    pub verifier_failed: usize,
    pub verifier_skipped: usize,
    /// True when the statistical pass was configured but did not run.
    pub statistical_skipped: bool,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub request_id: Uuid,
    pub results: Vec<ResolvedResult>,
    pub snapshot_version: u64,
    pub stats: AnalysisStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnonymizedText {
    pub request_id: Uuid,
    pub text: String,
    pub results: Vec<ResolvedResult>,
    pub masked_spans: Vec<MaskedSpan>,
}

/// Cheap to clone; clones share the registry and metrics.
#[derive(Clone)]
pub struct Analyzer {
    registry: Arc<RecognizerRegistry>,
    metrics: Arc<MetricsCollector>,
}

fn sort_results(results: &mut [ResolvedResult]) {
    results.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(a.end.cmp(&b.end))
            .then_with(|| a.entity_type.cmp(&b.entity_type))
    });
}

/// Runs the selected pattern recognizers. Runs on a blocking thread.
fn run_patterns(text: &str, recognizers: &[(usize, Recognizer)]) -> Vec<CandidateSpan> {
    let mut spans = Vec::new();
    for (order, recognizer) in recognizers {
        match recognizer.produce(text, *order) {
            Ok(found) => spans.extend(found),
            Err(e) => warn!("Recognizer '{}' failed and was skipped: {}", recognizer.name(), e),
        }
    }
    spans
}

impl Analyzer {
    pub fn new(registry: Arc<RecognizerRegistry>) -> Self {
        Self { registry, metrics: Arc::new(MetricsCollector::new()) }
    }

    /// Shares a metrics collector with other analyzers.
    pub fn with_metrics(registry: Arc<RecognizerRegistry>, metrics: Arc<MetricsCollector>) -> Self {
        Self { registry, metrics }
    }

    pub fn registry(&self) -> &Arc<RecognizerRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn analyze(&self, text: &str, options: &AnalyzeOptions) -> Result<AnalysisReport, ShieldError> {
        let snapshot = self.registry.snapshot();
        self.analyze_with(&snapshot, text, options).await
    }

    /// Analyzes `text` and masks what was found. Detection and masking use
    /// the same snapshot.
    pub async fn anonymize(&self, text: &str, options: &AnalyzeOptions) -> Result<AnonymizedText, ShieldError> {
        let snapshot = self.registry.snapshot();
        let report = self.analyze_with(&snapshot, text, options).await?;
        let (masked, masked_spans) = anonymizer::anonymize(text, &report.results, snapshot.settings.anonymizer.filler);
        Ok(AnonymizedText {
            request_id: report.request_id,
            text: masked,
            results: report.results,
            masked_spans,
        })
    }

    async fn analyze_with(
        &self,
        snapshot: &Arc<RegistrySnapshot>,
        text: &str,
        options: &AnalyzeOptions,
    ) -> Result<AnalysisReport, ShieldError> {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        self.metrics.record_request();

        let input_chars = text.chars().count();
        let max_chars = snapshot.settings.limits.max_input_chars;
        if input_chars > max_chars {
            self.metrics.record_rejected();
            return Err(ShieldError::InputTooLarge(input_chars, max_chars));
        }

        let mut stats = AnalysisStats { input_chars, ..AnalysisStats::default() };
        if text.is_empty() {
            self.metrics.record_success(&[]);
            return Ok(AnalysisReport { request_id, results: Vec::new(), snapshot_version: snapshot.version, stats });
        }
        debug!("Request {} analyzing {} chars on snapshot v{}.", request_id, input_chars, snapshot.version);

        let shared_text: Arc<str> = Arc::from(text);
        let (pattern_spans, statistical_spans) = tokio::join!(
            self.pattern_pass(snapshot, Arc::clone(&shared_text), options),
            self.statistical_pass(snapshot, Arc::clone(&shared_text), options),
        );
        let statistical_spans = match statistical_spans {
            Some(spans) => snapshot.filter.apply(spans),
            None => {
                stats.statistical_skipped = true;
                Vec::new()
            }
        };

        let mut candidates = pattern_spans;
        candidates.extend(statistical_spans.into_iter().filter(|s| options.wants(&s.entity_type)));
        stats.candidates = candidates.len();

        let merged = merge::resolve_overlaps(candidates);
        stats.merged = merged.len();

        let verify = options.verify.unwrap_or(true) && snapshot.gate.is_active();
        let policy = snapshot.policy();
        let mut results = Vec::with_capacity(merged.len());
        let mut to_verify = Vec::new();
        for span in merged {
            match policy.decide(&span.entity_type, span.score) {
                Decision::Reject => stats.below_threshold += 1,
                Decision::Candidate if verify && snapshot.gate.needs_verification(span.score) => {
                    to_verify.push(span.into_result())
                }
                Decision::Accept | Decision::Candidate => results.push(span.into_result()),
            }
        }
        stats.accepted = results.len();
        stats.sent_to_verifier = to_verify.len();
        self.metrics.record_below_threshold(stats.below_threshold);

        if !to_verify.is_empty() {
            let report = snapshot.gate.verify_all(text, to_verify).await;
            self.metrics.record_gate(&report);
            stats.verifier_confirmed = report.confirmed;
            stats.verifier_rejected = report.rejected;
            stats.verifier_failed = report.failed;
            stats.verifier_skipped = report.skipped;
            results.extend(report.results);
        }

        sort_results(&mut results);
        stats.elapsed_ms = started.elapsed().as_millis() as u64;
        self.metrics.record_success(&results);
        debug!(
            "Request {} finished with {} results in {} ms.",
            request_id,
            results.len(),
            stats.elapsed_ms
        );

        Ok(AnalysisReport { request_id, results, snapshot_version: snapshot.version, stats })
    }

    async fn pattern_pass(
        &self,
        snapshot: &RegistrySnapshot,
        text: Arc<str>,
        options: &AnalyzeOptions,
    ) -> Vec<CandidateSpan> {
        let selected: Vec<(usize, Recognizer)> = snapshot
            .recognizers
            .iter()
            .enumerate()
            .filter(|(_, r)| matches!(r, Recognizer::Pattern(_)) && options.wants_any_of(r))
            .map(|(i, r)| (i, r.clone()))
            .collect();
        if selected.is_empty() {
            return Vec::new();
        }

        match tokio::task::spawn_blocking(move || run_patterns(&text, &selected)).await {
            Ok(spans) => spans,
            Err(e) => {
                warn!("Pattern recognition task failed: {}. Continuing without regex results.", e);
                Vec::new()
            }
        }
    }

    /// `None` when the statistical recognizer was wanted but could not run.
    async fn statistical_pass(
        &self,
        snapshot: &RegistrySnapshot,
        text: Arc<str>,
        options: &AnalyzeOptions,
    ) -> Option<Vec<CandidateSpan>> {
        let Some((order, recognizer)) = snapshot
            .recognizers
            .iter()
            .enumerate()
            .find(|(_, r)| matches!(r, Recognizer::Statistical(_)))
        else {
            return Some(Vec::new());
        };
        if !options.wants_any_of(recognizer) {
            return Some(Vec::new());
        }

        let wait = Duration::from_millis(snapshot.settings.nlp.acquire_timeout_ms);
        let permit = match tokio::time::timeout(wait, Arc::clone(&snapshot.nlp_permits).acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) | Err(_) => {
                warn!(
                    "No entity extraction slot within {} ms; running regex recognizers only for this request.",
                    wait.as_millis()
                );
                self.metrics.record_statistical_skip();
                return None;
            }
        };

        let recognizer = recognizer.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            recognizer.produce(&text, order)
        })
        .await;

        match joined {
            Ok(Ok(spans)) => Some(spans),
            Ok(Err(e)) => {
                warn!("Statistical recognizer unavailable ({}); running regex recognizers only.", e);
                self.metrics.record_statistical_skip();
                None
            }
            Err(e) => {
                warn!("Statistical recognition task failed: {}", e);
                self.metrics.record_statistical_skip();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;

    fn analyzer_for(rules: &[&str]) -> Analyzer {
        let mut settings = EngineSettings::default();
        settings.recognizers.enabled = rules.iter().map(|r| r.to_string()).collect();
        Analyzer::new(Arc::new(RecognizerRegistry::new(settings).unwrap()))
    }

    #[test_log::test(tokio::test)]
    async fn test_phone_is_accepted_and_masked() {
        let analyzer = analyzer_for(&["cn_phone"]);
        let report = analyzer.analyze("13812345678", &AnalyzeOptions::default()).await.unwrap();
        assert_eq!(report.results.len(), 1);
        let r = &report.results[0];
        assert_eq!(r.entity_type, EntityType::Phone);
        assert_eq!((r.start, r.end), (0, 11));
        assert!(r.score >= 0.7);
        assert!(!r.verified);

        let masked = analyzer.anonymize("13812345678", &AnalyzeOptions::default()).await.unwrap();
        assert_eq!(masked.text, "138****5678");
    }

    #[tokio::test]
    async fn test_entity_filter() {
        let analyzer = analyzer_for(&[]);
        let text = "电话13812345678，邮箱zhangsan@qq.com";
        let report = analyzer
            .analyze(text, &AnalyzeOptions::entities([EntityType::Email]))
            .await
            .unwrap();
        assert!(!report.results.is_empty());
        assert!(report.results.iter().all(|r| r.entity_type == EntityType::Email));
    }

    #[tokio::test]
    async fn test_empty_and_oversized_input() {
        let mut settings = EngineSettings::default();
        settings.limits.max_input_chars = 8;
        let analyzer = Analyzer::new(Arc::new(RecognizerRegistry::new(settings).unwrap()));

        let report = analyzer.analyze("", &AnalyzeOptions::default()).await.unwrap();
        assert!(report.results.is_empty());

        let err = analyzer.analyze("一二三四五六七八九", &AnalyzeOptions::default()).await.unwrap_err();
        assert!(matches!(err, ShieldError::InputTooLarge(9, 8)));
        assert_eq!(analyzer.metrics().requests_rejected, 1);
    }
}
