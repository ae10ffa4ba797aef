// cnshield-core/src/scoring.rs
//! Confidence thresholds and the three-way decision gate.
//!
//! The same policy applies to spans from both recognizer families. A score at
//! or above `high` is accepted outright, a score below `low` is dropped and
//! everything in between is a candidate for verification.
//!
//! License: MIT OR APACHE 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entity::EntityType;
use crate::errors::ShieldError;

pub const DEFAULT_HIGH_THRESHOLD: f64 = 0.7;
pub const DEFAULT_LOW_THRESHOLD: f64 = 0.3;

/// Per-type replacement for one or both global thresholds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ThresholdOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub high_confidence_threshold: f64,
    pub low_confidence_threshold: f64,
    pub type_overrides: BTreeMap<EntityType, ThresholdOverride>,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            high_confidence_threshold: DEFAULT_HIGH_THRESHOLD,
            low_confidence_threshold: DEFAULT_LOW_THRESHOLD,
            type_overrides: BTreeMap::new(),
        }
    }
}

/// Outcome of the decision gate for one resolved span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Candidate,
    Reject,
}

impl ScoringPolicy {
    pub fn new(high: f64, low: f64) -> Result<Self, ShieldError> {
        let policy = Self {
            high_confidence_threshold: high,
            low_confidence_threshold: low,
            type_overrides: BTreeMap::new(),
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn with_override(mut self, entity_type: EntityType, high: Option<f64>, low: Option<f64>) -> Self {
        self.type_overrides.insert(entity_type, ThresholdOverride { high, low });
        self
    }

    /// Effective `(high, low)` for an entity type.
    pub fn thresholds_for(&self, entity_type: &EntityType) -> (f64, f64) {
        let mut high = self.high_confidence_threshold;
        let mut low = self.low_confidence_threshold;
        if let Some(o) = self.type_overrides.get(entity_type) {
            high = o.high.unwrap_or(high);
            low = o.low.unwrap_or(low);
        }
        (high, low)
    }

    pub fn decide(&self, entity_type: &EntityType, score: f64) -> Decision {
        let (high, low) = self.thresholds_for(entity_type);
        if score >= high {
            Decision::Accept
        } else if score < low {
            Decision::Reject
        } else {
            Decision::Candidate
        }
    }

    /// Thresholds must lie in `[0, 1]` with `low <= high`, globally and for
    /// every override after it is merged with the global values.
    pub fn validate(&self) -> Result<(), ShieldError> {
        check_pair(
            "global",
            self.high_confidence_threshold,
            self.low_confidence_threshold,
        )?;
        for entity_type in self.type_overrides.keys() {
            let (high, low) = self.thresholds_for(entity_type);
            check_pair(entity_type.as_str(), high, low)?;
        }
        Ok(())
    }
}

fn check_pair(scope: &str, high: f64, low: f64) -> Result<(), ShieldError> {
    for (name, v) in [("high", high), ("low", low)] {
        if !v.is_finite() || !(0.0..=1.0).contains(&v) {
            return Err(ShieldError::InvalidPolicy(format!(
                "{scope} {name} threshold {v} is outside [0, 1]"
            )));
        }
    }
    if low > high {
        return Err(ShieldError::InvalidPolicy(format!(
            "{scope} low threshold {low} exceeds high threshold {high}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_bands() {
        let p = ScoringPolicy::default();
        assert_eq!(p.decide(&EntityType::Phone, 0.7), Decision::Accept);
        assert_eq!(p.decide(&EntityType::Phone, 0.69), Decision::Candidate);
        assert_eq!(p.decide(&EntityType::Phone, 0.3), Decision::Candidate);
        assert_eq!(p.decide(&EntityType::Phone, 0.29), Decision::Reject);
    }

    #[test]
    fn test_override_replaces_one_side() {
        let p = ScoringPolicy::default().with_override(EntityType::PostalCode, Some(0.9), None);
        assert_eq!(p.thresholds_for(&EntityType::PostalCode), (0.9, 0.3));
        assert_eq!(p.decide(&EntityType::PostalCode, 0.8), Decision::Candidate);
        assert_eq!(p.decide(&EntityType::Phone, 0.8), Decision::Accept);
    }

    #[test]
    fn test_invalid_policies_are_rejected() {
        assert!(ScoringPolicy::new(0.3, 0.7).is_err());
        assert!(ScoringPolicy::new(1.2, 0.3).is_err());
        assert!(ScoringPolicy::new(0.5, 0.5).is_ok());

        let p = ScoringPolicy::default().with_override(EntityType::Email, None, Some(0.8));
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("EMAIL"));
    }
}
