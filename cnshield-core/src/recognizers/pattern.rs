// cnshield-core/src/recognizers/pattern.rs
//! The regex recognizer.
//!
//! Runs every compiled pattern of one rule over the input, applies the rule's
//! validator and blacklist, then the context boost. Offsets come out of the
//! regex engine as bytes and leave this module as chars.
//!
//! License: MIT OR APACHE 2.0

use cnshield_context::{BoostPolicy, ContextMatcher};
use fancy_regex::Regex;
use log::{debug, warn};

use crate::config::ValidatorFailurePolicy;
use crate::entity::EntityType;
use crate::span::{log_candidate_debug, CandidateSpan, SpanOrigin};
use crate::text::CharIndexMapper;
use crate::validators::{Validation, ValidatorKind};

/// Lowest score tier, used for demoted validator failures.
pub const DEMOTED_SCORE: f64 = 0.0;

/// One compiled pattern of a rule.
#[derive(Debug)]
pub struct CompiledPattern {
    pub name: String,
    pub regex: Regex,
    pub score: f64,
}

/// A rule compiled for matching. Immutable once built and shared between
/// snapshots through the compiler cache.
#[derive(Debug)]
pub struct PatternRecognizer {
    pub name: String,
    pub entity_type: EntityType,
    pub patterns: Vec<CompiledPattern>,
    pub context: ContextMatcher,
    pub validator: Option<ValidatorKind>,
    pub window_chars: usize,
    pub boost: BoostPolicy,
    pub validator_failure: ValidatorFailurePolicy,
}

impl PatternRecognizer {
    /// Finds every match of every pattern. Spans found by several patterns of
    /// this rule are reported once, with the best score. A pattern that hits
    /// the backtrack limit is abandoned for this text and logged; the other
    /// patterns still run.
    pub fn produce(&self, text: &str) -> Vec<CandidateSpan> {
        if text.is_empty() {
            return Vec::new();
        }
        let mapper = CharIndexMapper::new(text);
        let mut found: Vec<(usize, CandidateSpan)> = Vec::new();

        for (pattern_idx, pattern) in self.patterns.iter().enumerate() {
            for result in pattern.regex.find_iter(text) {
                let m = match result {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(
                            target: "cnshield_core::recognizer",
                            "Pattern '{}/{}' aborted, treating the rest of the text as no match: {}",
                            self.name, pattern.name, e
                        );
                        break;
                    }
                };
                if m.start() == m.end() {
                    continue;
                }
                if let Some(span) = self.score_match(text, &mapper, pattern, m.start(), m.end()) {
                    log_candidate_debug("cnshield_core::recognizer", &span);
                    found.push((pattern_idx, span));
                }
            }
        }

        // Best score first per (start, end); earlier pattern wins ties.
        found.sort_by(|(ia, a), (ib, b)| {
            a.start
                .cmp(&b.start)
                .then(a.end.cmp(&b.end))
                .then(b.score.total_cmp(&a.score))
                .then(ia.cmp(ib))
        });
        found.dedup_by(|(_, later), (_, kept)| later.start == kept.start && later.end == kept.end);
        found.into_iter().map(|(_, span)| span).collect()
    }

    fn score_match(
        &self,
        text: &str,
        mapper: &CharIndexMapper,
        pattern: &CompiledPattern,
        start: usize,
        end: usize,
    ) -> Option<CandidateSpan> {
        let matched = &text[start..end];

        let (validation, raw_score) = match self.validator {
            None => (None, pattern.score),
            Some(kind) => {
                if kind.is_blacklisted(matched) {
                    debug!(
                        target: "cnshield_core::recognizer",
                        "Rule '{}' dropped a blacklisted value.",
                        self.name
                    );
                    return None;
                }
                match kind.validate(matched) {
                    Validation::Valid => (Some(Validation::Valid), 1.0),
                    Validation::Inconclusive => (Some(Validation::Inconclusive), pattern.score),
                    Validation::Invalid => match self.validator_failure {
                        ValidatorFailurePolicy::Discard => return None,
                        ValidatorFailurePolicy::Demote => (Some(Validation::Invalid), DEMOTED_SCORE),
                    },
                }
            }
        };

        let words = self.context.find_around(text, start, end, self.window_chars);
        let score = self.boost.apply(raw_score, words.len());

        Some(CandidateSpan {
            entity_type: self.entity_type.clone(),
            start: mapper.to_char(start),
            end: mapper.to_char(end),
            text: matched.to_string(),
            raw_score,
            score,
            validation,
            validator_passed: validation != Some(Validation::Invalid),
            matched_context_words: words.into_iter().map(String::from).collect(),
            recognizer: self.name.clone(),
            pattern_name: Some(pattern.name.clone()),
            origin: SpanOrigin::Pattern,
            recognizer_order: 0,
        })
    }
}
