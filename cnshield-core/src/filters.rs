// cnshield-core/src/filters.rs
//! False-positive filter for statistical spans.
//!
//! Entity models routinely tag product names, variable names and dates as
//! people or PII. These rules drop such spans before they reach the merge
//! step. Regex spans are never filtered here.

use log::debug;
use std::collections::HashSet;

use crate::config::FilterConfig;
use crate::entity::EntityType;
use crate::span::{CandidateSpan, SpanOrigin};

/// Technology and product names that are not people.
pub const TECH_TERMS: &[&str] = &[
    "github", "slack", "docker", "redis", "mysql", "nginx", "apache", "linux", "windows", "macos",
    "python", "java", "golang", "rust", "kubernetes", "jenkins", "gitlab", "bitbucket", "aws",
    "azure", "gcp", "ghp", "gho", "ghs", "ghu", "xoxb", "xoxp",
];

#[derive(Debug, Clone)]
pub struct FalsePositiveFilter {
    config: FilterConfig,
    tech_terms: HashSet<String>,
}

impl FalsePositiveFilter {
    pub fn new(config: &FilterConfig) -> Self {
        let tech_terms = TECH_TERMS
            .iter()
            .map(|t| t.to_string())
            .chain(config.extra_tech_terms.iter().map(|t| t.trim().to_lowercase()))
            .collect();
        Self { config: config.clone(), tech_terms }
    }

    /// Whether a span should be dropped.
    pub fn rejects(&self, span: &CandidateSpan) -> bool {
        if !self.config.enabled || span.origin != SpanOrigin::Statistical {
            return false;
        }
        match span.entity_type {
            EntityType::DateTime => self.config.drop_date_time,
            EntityType::Person => {
                let text = span.text.trim();
                let len = text.chars().count();
                (self.config.drop_single_char_person && len <= 1)
                    || (self.config.drop_tech_terms && self.tech_terms.contains(&text.to_lowercase()))
                    || (self.config.drop_short_lowercase_person
                        && len < 5
                        && text.is_ascii()
                        && text.chars().any(|c| c.is_ascii_lowercase())
                        && !text.chars().any(|c| c.is_ascii_uppercase()))
            }
            _ => false,
        }
    }

    pub fn apply(&self, spans: Vec<CandidateSpan>) -> Vec<CandidateSpan> {
        let before = spans.len();
        let kept: Vec<CandidateSpan> = spans.into_iter().filter(|s| !self.rejects(s)).collect();
        if kept.len() != before {
            debug!(
                target: "cnshield_core::filters",
                "Dropped {} statistical spans as likely false positives.",
                before - kept.len()
            );
        }
        kept
    }
}
