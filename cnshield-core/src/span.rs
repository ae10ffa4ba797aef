// cnshield-core/src/span.rs
//! Candidate spans, resolved results and PII-safe logging helpers.
//!
//! All offsets in this module are char (codepoint) offsets into the input,
//! end-exclusive.

use lazy_static::lazy_static;
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::entity::EntityType;
use crate::validators::Validation;

lazy_static! {
    /// A static boolean that is initialized once to determine if PII is allowed in debug logs.
    static ref PII_DEBUG_ALLOWED: bool = {
        std::env::var("CNSHIELD_ALLOW_DEBUG_PII")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };
}

/// Which recognizer family produced a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanOrigin {
    Pattern,
    Statistical,
}

/// An unresolved detection from one recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSpan {
    pub entity_type: EntityType,
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Score before the context boost.
    pub raw_score: f64,
    /// Score after the context boost, clamped to `[0, 1]`.
    pub score: f64,
    /// `None` when the recognizer has no validator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    /// False only when a validator ran and reported the value invalid.
    pub validator_passed: bool,
    #[serde(default)]
    pub matched_context_words: Vec<String>,
    pub recognizer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_name: Option<String>,
    pub origin: SpanOrigin,
    /// Registration index of the producing recognizer in its snapshot.
    #[serde(skip)]
    pub recognizer_order: usize,
}

impl CandidateSpan {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &CandidateSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Converts the span into a final result carrying `self.score`.
    pub fn into_result(self) -> ResolvedResult {
        let sample_hash = Some(canonical_sample_hash(self.entity_type.as_str(), &self.text));
        ResolvedResult {
            entity_type: self.entity_type,
            start: self.start,
            end: self.end,
            score: self.score,
            verified: false,
            verification_reason: None,
            recognizer: self.recognizer,
            sample_hash,
            recognizer_order: self.recognizer_order,
        }
    }
}

/// A final detection returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedResult {
    pub entity_type: EntityType,
    pub start: usize,
    pub end: usize,
    pub score: f64,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_reason: Option<String>,
    pub recognizer: String,
    /// Salted-by-type SHA-256 of the normalized matched text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_hash: Option<String>,
    #[serde(skip)]
    pub recognizer_order: usize,
}

impl ResolvedResult {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &ResolvedResult) -> bool {
        self.start < other.end && other.start < self.end
    }
}

pub fn redact_sensitive(s: &str) -> String {
    const MAX_LEN: usize = 8;
    let len = s.chars().count();
    if len <= MAX_LEN {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED: {} chars]", len)
    }
}

/// The value itself when `CNSHIELD_ALLOW_DEBUG_PII=true`, a redaction marker otherwise.
pub fn loggable(sensitive_content: &str) -> String {
    if *PII_DEBUG_ALLOWED {
        sensitive_content.to_string()
    } else {
        redact_sensitive(sensitive_content)
    }
}

pub fn log_candidate_debug(module_path: &str, span: &CandidateSpan) {
    debug!(
        "{} Candidate: recognizer='{}', pattern={:?}, type={}, [{}, {}), text='{}', raw={}, score={}, context={:?}",
        module_path,
        span.recognizer,
        span.pattern_name,
        span.entity_type,
        span.start,
        span.end,
        loggable(&span.text),
        span.raw_score,
        span.score,
        span.matched_context_words
    );
}

pub fn log_mask_action_debug(module_path: &str, entity_type: &EntityType, original: &str, masked: &str) {
    debug!(
        "{} Mask action: type={}, original='{}', masked='{}'",
        module_path,
        entity_type,
        loggable(original),
        masked
    );
}

/// Stable hash of a matched value, keyed by entity type, for de-duplication
/// and audit without storing the value.
pub fn canonical_sample_hash(entity_type: &str, snippet: &str) -> String {
    let normalized = snippet
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let mut hasher = Sha256::new();
    hasher.update(entity_type.as_bytes());
    hasher.update(b":");
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
pub(crate) fn test_span(entity_type: EntityType, start: usize, end: usize, score: f64) -> CandidateSpan {
    CandidateSpan {
        entity_type,
        start,
        end,
        text: "x".repeat(end.saturating_sub(start)),
        raw_score: score,
        score,
        validation: None,
        validator_passed: true,
        matched_context_words: Vec::new(),
        recognizer: "test".to_string(),
        pattern_name: None,
        origin: SpanOrigin::Pattern,
        recognizer_order: 0,
    }
}
