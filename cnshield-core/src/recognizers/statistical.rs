// cnshield-core/src/recognizers/statistical.rs
//! The statistical recognizer.
//!
//! Wraps an external entity-extraction model behind [`EntityExtractor`], maps
//! its raw labels to canonical entity types and scores each span with the
//! surname, suffix, length and context heuristics.
//!
//! License: MIT OR APACHE 2.0

use cnshield_context::heuristics::{
    self, HeuristicWeights, SpanKind, DATE_TIME_CONTEXT, LOCATION_CONTEXT, ORGANIZATION_CONTEXT,
    PERSON_CONTEXT,
};
use cnshield_context::ContextMatcher;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::config::{ContextConfig, NlpConfig};
use crate::entity::EntityType;
use crate::errors::ShieldError;
use crate::span::{log_candidate_debug, CandidateSpan, SpanOrigin};
use crate::text::CharIndexMapper;

/// A raw span from the model. Offsets are char offsets, end-exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntity {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

impl RawEntity {
    pub fn new(label: impl Into<String>, start: usize, end: usize) -> Self {
        Self { label: label.into(), start, end }
    }
}

/// An entity-extraction model. Must be deterministic for a fixed model
/// version; it is called from blocking worker threads.
pub trait EntityExtractor: Send + Sync {
    fn name(&self) -> &str {
        "nlp"
    }

    fn extract(&self, text: &str) -> anyhow::Result<Vec<RawEntity>>;
}

pub struct StatisticalRecognizer {
    extractor: Arc<dyn EntityExtractor>,
    name: String,
    label_mapping: HashMap<String, EntityType>,
    ignored: HashSet<String>,
    base_score: f64,
    window_chars: usize,
    weights: HeuristicWeights,
    context: BTreeMap<EntityType, ContextMatcher>,
}

impl fmt::Debug for StatisticalRecognizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatisticalRecognizer")
            .field("name", &self.name)
            .field("labels", &self.label_mapping.len())
            .field("base_score", &self.base_score)
            .field("window_chars", &self.window_chars)
            .finish()
    }
}

fn default_context(entity_type: &EntityType) -> &'static [&'static str] {
    match entity_type {
        EntityType::Person => PERSON_CONTEXT,
        EntityType::Location => LOCATION_CONTEXT,
        EntityType::Organization => ORGANIZATION_CONTEXT,
        EntityType::DateTime => DATE_TIME_CONTEXT,
        _ => &[],
    }
}

fn span_kind(entity_type: &EntityType) -> SpanKind {
    match entity_type {
        EntityType::Person => SpanKind::Person,
        EntityType::Location => SpanKind::Location,
        EntityType::Organization => SpanKind::Organization,
        _ => SpanKind::Other,
    }
}

impl StatisticalRecognizer {
    pub fn new(
        extractor: Arc<dyn EntityExtractor>,
        nlp: &NlpConfig,
        context: &ContextConfig,
    ) -> Result<Self, ShieldError> {
        let label_mapping: HashMap<String, EntityType> = nlp
            .label_mapping
            .iter()
            .map(|(label, e)| (label.trim().to_ascii_uppercase(), e.clone()))
            .collect();
        let ignored = nlp
            .labels_to_ignore
            .iter()
            .map(|l| l.trim().to_ascii_uppercase())
            .collect();

        let mut matchers = BTreeMap::new();
        for entity_type in label_mapping.values() {
            if matchers.contains_key(entity_type) {
                continue;
            }
            let words = default_context(entity_type)
                .iter()
                .map(|w| w.to_string())
                .chain(context.extra_words(entity_type).iter().cloned());
            let matcher = ContextMatcher::new(words)
                .map_err(|e| ShieldError::InvalidConfig(format!("nlp context words for {entity_type}: {e}")))?;
            matchers.insert(entity_type.clone(), matcher);
        }

        Ok(Self {
            name: extractor.name().to_string(),
            extractor,
            label_mapping,
            ignored,
            base_score: nlp.base_score,
            window_chars: nlp.context_window_chars,
            weights: HeuristicWeights::default(),
            context: matchers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity types this recognizer can emit.
    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.context.keys()
    }

    /// Canonical type for a raw label, or `None` when the label is ignored or unmapped.
    pub fn map_label(&self, label: &str) -> Option<EntityType> {
        let label = label.trim().to_ascii_uppercase();
        if self.ignored.contains(&label) {
            return None;
        }
        self.label_mapping.get(&label).cloned()
    }

    /// Runs the model and scores its spans. A model failure is returned as
    /// `ShieldError::Model` for the caller to recover from.
    pub fn produce(&self, text: &str) -> Result<Vec<CandidateSpan>, ShieldError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let raw = self
            .extractor
            .extract(text)
            .map_err(|e| ShieldError::Model(format!("{e:#}")))?;
        let mapper = CharIndexMapper::new(text);
        let char_len = mapper.char_len();

        let mut spans = Vec::new();
        for entity in raw {
            let Some(entity_type) = self.map_label(&entity.label) else {
                debug!(target: "cnshield_core::nlp", "Dropping span with label '{}'.", entity.label);
                continue;
            };
            if entity.start >= entity.end || entity.end > char_len {
                warn!(
                    target: "cnshield_core::nlp",
                    "Model '{}' returned an out-of-range span [{}, {}) for text of {} chars.",
                    self.name, entity.start, entity.end, char_len
                );
                continue;
            }
            let (start_b, end_b) = (mapper.to_byte(entity.start), mapper.to_byte(entity.end));
            let matched = &text[start_b..end_b];

            let words: Vec<String> = self
                .context
                .get(&entity_type)
                .map(|m| m.find_around(text, start_b, end_b, self.window_chars))
                .unwrap_or_default()
                .into_iter()
                .map(String::from)
                .collect();
            let score = heuristics::statistical_score(
                self.base_score,
                span_kind(&entity_type),
                matched,
                !words.is_empty(),
                &self.weights,
            );

            let span = CandidateSpan {
                entity_type,
                start: entity.start,
                end: entity.end,
                text: matched.to_string(),
                raw_score: self.base_score,
                score,
                validation: None,
                validator_passed: true,
                matched_context_words: words,
                recognizer: self.name.clone(),
                pattern_name: None,
                origin: SpanOrigin::Statistical,
                recognizer_order: 0,
            };
            log_candidate_debug("cnshield_core::nlp", &span);
            spans.push(span);
        }
        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<RawEntity>);

    impl EntityExtractor for Fixed {
        fn extract(&self, _text: &str) -> anyhow::Result<Vec<RawEntity>> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl EntityExtractor for Broken {
        fn extract(&self, _text: &str) -> anyhow::Result<Vec<RawEntity>> {
            anyhow::bail!("model not loaded")
        }
    }

    fn recognizer(entities: Vec<RawEntity>) -> StatisticalRecognizer {
        StatisticalRecognizer::new(Arc::new(Fixed(entities)), &NlpConfig::default(), &ContextConfig::default()).unwrap()
    }

    #[test]
    fn test_labels_are_mapped_and_ignored() {
        let r = recognizer(vec![]);
        assert_eq!(r.map_label("per"), Some(EntityType::Person));
        assert_eq!(r.map_label("GPE"), Some(EntityType::Location));
        assert_eq!(r.map_label("CARDINAL"), None);
        assert_eq!(r.map_label("UNKNOWN"), None);
    }

    #[test]
    fn test_person_heuristics() {
        let text = "姓名：张三，住址北京市";
        let r = recognizer(vec![
            RawEntity::new("PERSON", 3, 5),
            RawEntity::new("GPE", 8, 11),
            RawEntity::new("CARDINAL", 0, 1),
        ]);
        let spans = r.produce(text).unwrap();
        assert_eq!(spans.len(), 2);
        let person = &spans[0];
        assert_eq!(person.text, "张三");
        assert_eq!(person.score, 1.0);
        assert_eq!(person.origin, SpanOrigin::Statistical);
        let place = &spans[1];
        assert_eq!(place.entity_type, EntityType::Location);
        assert_eq!(place.score, 1.0);
    }

    #[test]
    fn test_weak_shape_is_penalised() {
        let r = recognizer(vec![RawEntity::new("PERSON", 0, 1)]);
        let spans = r.produce("X went home").unwrap();
        assert_eq!(spans[0].score, 0.425);
    }

    #[test]
    fn test_out_of_range_spans_are_dropped() {
        let r = recognizer(vec![RawEntity::new("PERSON", 2, 40), RawEntity::new("ORG", 3, 3)]);
        assert!(r.produce("short").unwrap().is_empty());
    }

    #[test]
    fn test_model_failure_is_reported() {
        let r = StatisticalRecognizer::new(Arc::new(Broken), &NlpConfig::default(), &ContextConfig::default()).unwrap();
        assert!(matches!(r.produce("张三"), Err(ShieldError::Model(_))));
    }
}
