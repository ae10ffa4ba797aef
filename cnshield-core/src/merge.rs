// cnshield-core/src/merge.rs
//! Overlap resolution between candidate spans.
//!
//! Spans are resolved per entity type; spans of different types never
//! compete. Within a type, candidates are taken in priority order and a
//! candidate is kept only if it does not overlap one already kept. Priority
//! is: higher score, longer span, regex origin over statistical origin, then
//! earlier start, earlier registration and name as final tie-breaks. Because
//! the priority is a total order on distinct spans, the output does not depend
//! on the order candidates arrive in.
//!
//! License: MIT OR APACHE 2.0

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::entity::EntityType;
use crate::span::CandidateSpan;

/// Total priority order; `Less` means `a` wins over `b`.
pub fn priority(a: &CandidateSpan, b: &CandidateSpan) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.len().cmp(&a.len()))
        .then_with(|| a.origin.cmp(&b.origin))
        .then_with(|| a.start.cmp(&b.start))
        .then_with(|| a.recognizer_order.cmp(&b.recognizer_order))
        .then_with(|| a.recognizer.cmp(&b.recognizer))
        .then_with(|| a.pattern_name.cmp(&b.pattern_name))
        .then_with(|| b.raw_score.total_cmp(&a.raw_score))
}

/// Non-overlapping intervals kept for one entity type, keyed by start.
#[derive(Default)]
struct Occupied(BTreeMap<usize, usize>);

impl Occupied {
    fn is_free(&self, start: usize, end: usize) -> bool {
        if let Some((_, &prev_end)) = self.0.range(..=start).next_back() {
            if prev_end > start {
                return false;
            }
        }
        match self.0.range(start..).next() {
            Some((&next_start, _)) => next_start >= end,
            None => true,
        }
    }

    fn insert(&mut self, start: usize, end: usize) {
        self.0.insert(start, end);
    }
}

/// Reduces candidates to a set with no same-type overlaps, sorted by
/// `(start, end, entity_type)`. Empty spans are dropped.
pub fn resolve_overlaps(candidates: Vec<CandidateSpan>) -> Vec<CandidateSpan> {
    let total = candidates.len();
    let mut groups: HashMap<EntityType, Vec<CandidateSpan>> = HashMap::new();
    for span in candidates.into_iter().filter(|s| !s.is_empty()) {
        groups.entry(span.entity_type.clone()).or_default().push(span);
    }

    let mut resolved = Vec::new();
    for (_, mut group) in groups {
        group.sort_by(priority);
        let mut occupied = Occupied::default();
        for span in group {
            if occupied.is_free(span.start, span.end) {
                occupied.insert(span.start, span.end);
                resolved.push(span);
            }
        }
    }

    sort_by_position(&mut resolved);
    debug!(
        target: "cnshield_core::merge",
        "Resolved {} candidates into {} spans.",
        total,
        resolved.len()
    );
    resolved
}

pub fn sort_by_position(spans: &mut [CandidateSpan]) {
    spans.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(a.end.cmp(&b.end))
            .then_with(|| a.entity_type.cmp(&b.entity_type))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{test_span, SpanOrigin};

    fn key(spans: &[CandidateSpan]) -> Vec<(EntityType, usize, usize, String)> {
        spans
            .iter()
            .map(|s| (s.entity_type.clone(), s.start, s.end, s.recognizer.clone()))
            .collect()
    }

    #[test]
    fn test_higher_score_wins() {
        let out = resolve_overlaps(vec![
            test_span(EntityType::Phone, 0, 11, 0.5),
            test_span(EntityType::Phone, 3, 14, 0.9),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].start, out[0].end), (3, 14));
    }

    #[test]
    fn test_tie_prefers_longer_then_pattern_origin() {
        let out = resolve_overlaps(vec![
            test_span(EntityType::Person, 0, 2, 0.8),
            test_span(EntityType::Person, 0, 3, 0.8),
        ]);
        assert_eq!((out[0].start, out[0].end), (0, 3));

        let mut nlp = test_span(EntityType::Person, 0, 3, 0.8);
        nlp.origin = SpanOrigin::Statistical;
        nlp.recognizer = "nlp".into();
        let out = resolve_overlaps(vec![nlp, test_span(EntityType::Person, 0, 3, 0.8)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].origin, SpanOrigin::Pattern);
    }

    #[test]
    fn test_different_types_may_overlap() {
        let out = resolve_overlaps(vec![
            test_span(EntityType::Location, 0, 20, 0.9),
            test_span(EntityType::Phone, 5, 16, 0.9),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_no_chain_loss() {
        // b beats a and c, but a and c do not overlap each other.
        let out = resolve_overlaps(vec![
            test_span(EntityType::Email, 0, 5, 0.6),
            test_span(EntityType::Email, 4, 7, 0.9),
            test_span(EntityType::Email, 6, 10, 0.6),
        ]);
        assert_eq!(key(&out).len(), 1);
        assert_eq!((out[0].start, out[0].end), (4, 7));

        let out = resolve_overlaps(vec![
            test_span(EntityType::Email, 0, 5, 0.9),
            test_span(EntityType::Email, 4, 7, 0.6),
            test_span(EntityType::Email, 6, 10, 0.9),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_order_independence() {
        let mut spans = Vec::new();
        for (i, (s, e, score)) in [
            (0, 5, 0.5),
            (2, 8, 0.7),
            (7, 12, 0.7),
            (11, 15, 0.4),
            (3, 4, 0.95),
            (14, 20, 0.7),
            (2, 8, 0.7),
        ]
        .into_iter()
        .enumerate()
        {
            let mut span = test_span(EntityType::Phone, s, e, score);
            span.recognizer = format!("r{}", i % 3);
            spans.push(span);
        }
        spans.push(test_span(EntityType::Email, 1, 9, 0.3));

        let expected = key(&resolve_overlaps(spans.clone()));
        for rotation in 0..spans.len() {
            let mut permuted = spans.clone();
            permuted.rotate_left(rotation);
            assert_eq!(key(&resolve_overlaps(permuted.clone())), expected);
            permuted.reverse();
            assert_eq!(key(&resolve_overlaps(permuted)), expected);
        }

        let out = resolve_overlaps(spans);
        for (i, a) in out.iter().enumerate() {
            for b in &out[i + 1..] {
                assert!(a.entity_type != b.entity_type || !a.overlaps(b));
            }
        }
    }

    #[test]
    fn test_empty_spans_are_dropped() {
        assert!(resolve_overlaps(vec![test_span(EntityType::Phone, 4, 4, 0.9)]).is_empty());
    }
}
