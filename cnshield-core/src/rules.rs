// cnshield-core/src/rules.rs
//! Recognizer rule definitions and rule catalogs.
//!
//! A rule is the serializable description of one recognizer: its entity type,
//! its ordered named patterns with base scores, its context words and an
//! optional structural validator. The builtin catalog is embedded at compile
//! time; custom rule files use the same YAML shape and are merged over it by
//! name.
//!
//! License: MIT OR APACHE 2.0

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::entity::EntityType;
use crate::errors::ShieldError;
use crate::validators::ValidatorKind;

/// Maximum allowed length for a regex pattern string.
pub const MAX_PATTERN_LENGTH: usize = 500;

/// One named regex with its base score.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PatternDefinition {
    pub name: String,
    pub regex: String,
    pub score: f64,
}

impl Hash for PatternDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.regex.hash(state);
        self.score.to_bits().hash(state);
    }
}

/// Where a rule came from. Builtin rules can be edited but not renamed or deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSource {
    Builtin,
    #[default]
    Custom,
}

fn default_enabled() -> bool {
    true
}

/// The serializable definition of one recognizer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RuleDefinition {
    /// Unique identifier for the rule (e.g., "cn_phone").
    pub name: String,
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub source: RuleSource,
    /// Ordered patterns. Order only matters for diagnostics.
    pub patterns: Vec<PatternDefinition>,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<ValidatorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Only the fields that change what a compiled recognizer matches are hashed,
/// so toggling `enabled` or editing the description keeps the cache warm.
impl Hash for RuleDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.entity_type.hash(state);
        self.patterns.hash(state);
        self.context.hash(state);
        self.validator.hash(state);
    }
}

impl RuleDefinition {
    /// Creates an enabled custom rule with no validator.
    pub fn custom(name: impl Into<String>, entity_type: EntityType, patterns: Vec<PatternDefinition>) -> Self {
        Self {
            name: name.into(),
            entity_type,
            description: None,
            category: None,
            source: RuleSource::Custom,
            patterns,
            context: Vec::new(),
            enabled: true,
            validator: None,
            updated_at: None,
        }
    }

    pub fn with_context<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context = words.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_builtin(&self) -> bool {
        self.source == RuleSource::Builtin
    }

    /// Checks required fields, score ranges, pattern lengths and that every
    /// pattern compiles. Length and compilation failures are reported with
    /// their dedicated error variants; all other problems are collected into a
    /// single `InvalidRule`.
    pub fn validate(&self, max_pattern_length: usize) -> Result<(), ShieldError> {
        let label = if self.name.is_empty() { "<unnamed>" } else { self.name.as_str() };
        let mut problems = Vec::new();

        if self.name.trim().is_empty() {
            problems.push("name must not be empty".to_string());
        } else if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            problems.push("name may only contain ASCII letters, digits, '_' and '-'".to_string());
        }

        if self.patterns.is_empty() {
            problems.push("at least one pattern is required".to_string());
        }

        let mut pattern_names = HashSet::new();
        for pattern in &self.patterns {
            if pattern.name.trim().is_empty() {
                problems.push("a pattern has an empty name".to_string());
            } else if !pattern_names.insert(pattern.name.as_str()) {
                problems.push(format!("duplicate pattern name '{}'", pattern.name));
            }
            if !pattern.score.is_finite() || !(0.0..=1.0).contains(&pattern.score) {
                problems.push(format!(
                    "pattern '{}' score {} is outside [0, 1]",
                    pattern.name, pattern.score
                ));
            }
            if pattern.regex.is_empty() {
                problems.push(format!("pattern '{}' has an empty regex", pattern.name));
                continue;
            }
            if pattern.regex.len() > max_pattern_length {
                return Err(ShieldError::PatternLengthExceeded(
                    format!("{}/{}", label, pattern.name),
                    pattern.regex.len(),
                    max_pattern_length,
                ));
            }
            if let Err(e) = fancy_regex::Regex::new(&pattern.regex) {
                return Err(ShieldError::RuleCompilationError(
                    format!("{}/{}", label, pattern.name),
                    Box::new(e),
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ShieldError::InvalidRule(label.to_string(), problems.join("; ")))
        }
    }
}

/// An ordered collection of rule definitions, as stored in a YAML rule file.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct RuleStore {
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RuleStore {
    /// Loads rules from a YAML file and validates them.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading custom rules from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule file {}", path.display()))?;
        let store: RuleStore = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse rule file {}", path.display()))?;

        validate_rules(&store.rules, MAX_PATTERN_LENGTH)?;
        info!("Loaded {} rules from file {}.", store.rules.len(), path.display());
        Ok(store)
    }

    /// Writes the rules to a YAML file, replacing it.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yml::to_string(self).context("Failed to serialize rules")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write rule file {}", path.display()))?;
        debug!("Saved {} rules to {}.", self.rules.len(), path.display());
        Ok(())
    }

    /// Loads the builtin catalog embedded in the binary.
    pub fn load_builtin_rules() -> Result<Self> {
        debug!("Loading builtin rules from embedded catalog...");
        let yaml = include_str!("../config/builtin_rules.yaml");
        let mut store: RuleStore =
            serde_yml::from_str(yaml).context("Failed to parse builtin rules")?;
        for rule in &mut store.rules {
            rule.source = RuleSource::Builtin;
        }
        debug!("Loaded {} builtin rules.", store.rules.len());
        Ok(store)
    }

    pub fn get(&self, name: &str) -> Option<&RuleDefinition> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RuleDefinition> {
        self.rules.iter_mut().find(|r| r.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Rules that should run given the `enabled` allowlist and `disabled`
    /// denylist from settings. An empty allowlist allows every rule. Names in
    /// either list that match no rule are logged and ignored.
    pub fn active_rules(&self, enabled: &[String], disabled: &[String]) -> Vec<&RuleDefinition> {
        let enable_set: HashSet<&str> = enabled.iter().map(String::as_str).collect();
        let disable_set: HashSet<&str> = disabled.iter().map(String::as_str).collect();
        let all_rule_names: HashSet<&str> = self.rules.iter().map(|r| r.name.as_str()).collect();

        for rule_name in enable_set.difference(&all_rule_names) {
            warn!("Rule '{}' in `enabled` list does not exist.", rule_name);
        }
        for rule_name in disable_set.difference(&all_rule_names) {
            warn!("Rule '{}' in `disabled` list does not exist.", rule_name);
        }

        self.rules
            .iter()
            .filter(|rule| {
                let name = rule.name.as_str();
                rule.enabled
                    && !disable_set.contains(name)
                    && (enable_set.is_empty() || enable_set.contains(name))
            })
            .collect()
    }
}

/// Merges user rules over the builtin catalog.
///
/// Builtin order is preserved. A user rule whose name matches a builtin rule
/// replaces it in place and stays marked builtin; every other user rule is
/// appended, in file order, as a custom rule.
pub fn merge_rules(builtin: RuleStore, user: Option<RuleStore>) -> RuleStore {
    debug!("merge_rules called. Builtin rules count: {}", builtin.rules.len());
    let mut rules = builtin.rules;

    if let Some(user) = user {
        debug!("User rules provided. Merging {} user rules.", user.rules.len());
        let index: HashMap<String, usize> = rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();

        for mut user_rule in user.rules {
            match index.get(&user_rule.name) {
                Some(&i) => {
                    debug!("Overriding builtin rule '{}'.", user_rule.name);
                    user_rule.source = rules[i].source;
                    rules[i] = user_rule;
                }
                None => {
                    user_rule.source = RuleSource::Custom;
                    if let Some(existing) = rules.iter_mut().find(|r| r.name == user_rule.name) {
                        *existing = user_rule;
                    } else {
                        rules.push(user_rule);
                    }
                }
            }
        }
    }

    debug!("Final total rules after merge: {}", rules.len());
    RuleStore { rules }
}

/// Validates every rule and checks that names are unique, reporting all
/// problems at once.
pub fn validate_rules(rules: &[RuleDefinition], max_pattern_length: usize) -> Result<()> {
    let mut rule_names = HashSet::new();
    let mut errors = Vec::new();

    for rule in rules {
        if !rule.name.is_empty() && !rule_names.insert(rule.name.as_str()) {
            errors.push(format!("Duplicate rule name found: '{}'.", rule.name));
        }
        if let Err(e) = rule.validate(max_pattern_length) {
            errors.push(e.to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("Rule validation failed:\n{}", errors.join("\n")))
    }
}
