// cnshield-core/src/recognizers/mod.rs
//! Recognizer variants.
//!
//! Every recognizer, regex-based or statistical, answers the same question:
//! given a text, which candidate spans does it see? The set of variants is
//! closed; a new kind of recognizer is a new variant here.
//!
//! License: MIT OR APACHE 2.0

pub mod compiler;
pub mod pattern;
pub mod statistical;

use std::sync::Arc;

use crate::entity::EntityType;
use crate::errors::ShieldError;
use crate::span::{CandidateSpan, SpanOrigin};

pub use compiler::{compile_rule, get_or_compile, CompileOptions};
pub use pattern::{CompiledPattern, PatternRecognizer};
pub use statistical::{EntityExtractor, RawEntity, StatisticalRecognizer};

#[derive(Debug, Clone)]
pub enum Recognizer {
    Pattern(Arc<PatternRecognizer>),
    Statistical(Arc<StatisticalRecognizer>),
}

impl Recognizer {
    pub fn name(&self) -> &str {
        match self {
            Recognizer::Pattern(r) => &r.name,
            Recognizer::Statistical(r) => r.name(),
        }
    }

    pub fn origin(&self) -> SpanOrigin {
        match self {
            Recognizer::Pattern(_) => SpanOrigin::Pattern,
            Recognizer::Statistical(_) => SpanOrigin::Statistical,
        }
    }

    /// Whether this recognizer can emit `entity_type`.
    pub fn supports(&self, entity_type: &EntityType) -> bool {
        match self {
            Recognizer::Pattern(r) => &r.entity_type == entity_type,
            Recognizer::Statistical(r) => r.entity_types().any(|e| e == entity_type),
        }
    }

    /// Produces candidate spans tagged with `order`, the recognizer's
    /// registration index. Only the statistical variant can fail.
    pub fn produce(&self, text: &str, order: usize) -> Result<Vec<CandidateSpan>, ShieldError> {
        let mut spans = match self {
            Recognizer::Pattern(r) => r.produce(text),
            Recognizer::Statistical(r) => r.produce(text)?,
        };
        for span in &mut spans {
            span.recognizer_order = order;
        }
        Ok(spans)
    }
}
