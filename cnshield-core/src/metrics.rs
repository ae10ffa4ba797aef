// cnshield-core/src/metrics.rs
//! In-process counters for analysis requests.
//!
//! Counters are lock-free atomics except the per-type entity tally, which
//! takes a short mutex once per request.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::entity::EntityType;
use crate::span::ResolvedResult;
use crate::verifier::GateReport;

/// A point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_succeeded: u64,
    pub requests_rejected: u64,
    pub entities_by_type: BTreeMap<EntityType, u64>,
    /// Spans dropped by the decision gate for scoring below the low threshold.
    pub below_threshold: u64,
    pub verifier_confirmed: u64,
    pub verifier_rejected: u64,
    pub verifier_failed: u64,
    pub verifier_skipped: u64,
    pub statistical_skipped: u64,
}

impl MetricsSnapshot {
    pub fn entities_total(&self) -> u64 {
        self.entities_by_type.values().sum()
    }

    /// Share of verified candidates the verifier confirmed.
    pub fn confirmation_rate(&self) -> f64 {
        let judged = self.verifier_confirmed + self.verifier_rejected;
        if judged == 0 {
            0.0
        } else {
            self.verifier_confirmed as f64 / judged as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    requests_total: AtomicU64,
    requests_succeeded: AtomicU64,
    requests_rejected: AtomicU64,
    below_threshold: AtomicU64,
    verifier_confirmed: AtomicU64,
    verifier_rejected: AtomicU64,
    verifier_failed: AtomicU64,
    verifier_skipped: AtomicU64,
    statistical_skipped: AtomicU64,
    entities_by_type: Mutex<BTreeMap<EntityType, u64>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// A request refused before recognition (e.g. input too large).
    pub fn record_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, results: &[ResolvedResult]) {
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
        if results.is_empty() {
            return;
        }
        let mut by_type = self.entities_by_type.lock().unwrap_or_else(|p| p.into_inner());
        for r in results {
            *by_type.entry(r.entity_type.clone()).or_default() += 1;
        }
    }

    pub fn record_below_threshold(&self, count: usize) {
        self.below_threshold.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_gate(&self, report: &GateReport) {
        self.verifier_confirmed.fetch_add(report.confirmed as u64, Ordering::Relaxed);
        self.verifier_rejected.fetch_add(report.rejected as u64, Ordering::Relaxed);
        self.verifier_failed.fetch_add(report.failed as u64, Ordering::Relaxed);
        self.verifier_skipped.fetch_add(report.skipped as u64, Ordering::Relaxed);
    }

    pub fn record_statistical_skip(&self) {
        self.statistical_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            entities_by_type: self.entities_by_type.lock().unwrap_or_else(|p| p.into_inner()).clone(),
            below_threshold: self.below_threshold.load(Ordering::Relaxed),
            verifier_confirmed: self.verifier_confirmed.load(Ordering::Relaxed),
            verifier_rejected: self.verifier_rejected.load(Ordering::Relaxed),
            verifier_failed: self.verifier_failed.load(Ordering::Relaxed),
            verifier_skipped: self.verifier_skipped.load(Ordering::Relaxed),
            statistical_skipped: self.statistical_skipped.load(Ordering::Relaxed),
        }
    }
}
