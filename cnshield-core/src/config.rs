// cnshield-core/src/config.rs
//! Engine settings.
//!
//! `EngineSettings` groups every tunable of the pipeline: scoring thresholds,
//! the verification gate, the statistical recognizer, context boosting,
//! rule selection, resource limits, masking and the false-positive filter.
//! Settings are read from YAML, optionally overridden from `CNSHIELD_*`
//! environment variables and validated as a whole before use.
//!
//! License: MIT OR APACHE 2.0

use anyhow::{Context, Result};
use cnshield_context::BoostPolicy;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::entity::EntityType;
use crate::errors::ShieldError;
use crate::rules::MAX_PATTERN_LENGTH;
use crate::scoring::ScoringPolicy;

/// Top-level settings for one engine instance.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    pub scoring: ScoringPolicy,
    pub verifier: VerifierConfig,
    pub nlp: NlpConfig,
    pub context: ContextConfig,
    pub recognizers: RecognizerSelection,
    pub limits: LimitsConfig,
    pub anonymizer: AnonymizerConfig,
    pub filters: FilterConfig,
    pub documents: DocumentConfig,
}

// ---- verifier ----

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifierMode {
    #[default]
    Disabled,
    Api,
    Local,
    Mock,
}

impl fmt::Display for VerifierMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerifierMode::Disabled => "disabled",
            VerifierMode::Api => "api",
            VerifierMode::Local => "local",
            VerifierMode::Mock => "mock",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for VerifierMode {
    type Err = ShieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "none" | "off" => Ok(VerifierMode::Disabled),
            "api" => Ok(VerifierMode::Api),
            "local" => Ok(VerifierMode::Local),
            "mock" => Ok(VerifierMode::Mock),
            other => Err(ShieldError::InvalidConfig(format!(
                "unknown verifier mode '{other}' (expected disabled, api, local or mock)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub enabled: bool,
    pub mode: VerifierMode,
    /// Candidates scoring below this are sent to the verifier.
    pub score_threshold: f64,
    /// Chars of surrounding text sent on each side of the entity.
    pub context_window_chars: usize,
    pub timeout_ms: u64,
    pub api: ApiVerifierConfig,
    pub mock: MockVerifierConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: VerifierMode::Disabled,
            score_threshold: 0.7,
            context_window_chars: 30,
            timeout_ms: 30_000,
            api: ApiVerifierConfig::default(),
            mock: MockVerifierConfig::default(),
            rate_limit: None,
        }
    }
}

impl VerifierConfig {
    /// Whether candidates are routed to a verifier at all.
    pub fn is_active(&self) -> bool {
        self.enabled && self.mode != VerifierMode::Disabled
    }
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiVerifierConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ApiVerifierConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            model: String::new(),
            api_key: None,
            temperature: 0.1,
            max_tokens: 256,
        }
    }
}

impl fmt::Debug for ApiVerifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiVerifierConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MockVerifierConfig {
    pub confirm: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Default for MockVerifierConfig {
    fn default() -> Self {
        Self { confirm: true, reason: None }
    }
}

/// Token bucket guarding verifier calls.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub burst: u32,
    pub per_second: f64,
}

// ---- statistical recognizer ----

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NlpConfig {
    pub enabled: bool,
    pub base_score: f64,
    /// Raw model label → canonical entity type.
    pub label_mapping: BTreeMap<String, EntityType>,
    pub labels_to_ignore: Vec<String>,
    pub max_concurrency: usize,
    pub acquire_timeout_ms: u64,
    pub context_window_chars: usize,
}

impl Default for NlpConfig {
    fn default() -> Self {
        let label_mapping = [
            ("PERSON", EntityType::Person),
            ("PER", EntityType::Person),
            ("GPE", EntityType::Location),
            ("LOC", EntityType::Location),
            ("FAC", EntityType::Location),
            ("ORG", EntityType::Organization),
            ("DATE", EntityType::DateTime),
            ("TIME", EntityType::DateTime),
        ]
        .into_iter()
        .map(|(label, e)| (label.to_string(), e))
        .collect();

        let labels_to_ignore = [
            "CARDINAL", "ORDINAL", "QUANTITY", "MONEY", "PERCENT", "NORP", "LANGUAGE", "LAW",
            "PRODUCT", "EVENT", "WORK_OF_ART",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            enabled: true,
            base_score: 0.85,
            label_mapping,
            labels_to_ignore,
            max_concurrency: 2,
            acquire_timeout_ms: 5_000,
            context_window_chars: 20,
        }
    }
}

// ---- context ----

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContextConfig {
    pub window_chars: usize,
    pub boost_per_word: f64,
    pub max_boost: f64,
    /// Extra context words per entity type, added to every rule of that type
    /// and to the statistical recognizer's tables.
    pub words: BTreeMap<EntityType, Vec<String>>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window_chars: 30,
            boost_per_word: 0.1,
            max_boost: 0.4,
            words: BTreeMap::new(),
        }
    }
}

impl ContextConfig {
    pub fn boost_policy(&self) -> BoostPolicy {
        BoostPolicy { per_word: self.boost_per_word, max_boost: self.max_boost }
    }

    pub fn extra_words(&self, entity_type: &EntityType) -> &[String] {
        self.words.get(entity_type).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ---- recognizer selection ----

/// What happens to a regex match whose validator reports it invalid.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorFailurePolicy {
    #[default]
    Discard,
    Demote,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecognizerSelection {
    /// Allowlist of rule names. Empty means every enabled rule runs.
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    pub validator_failure: ValidatorFailurePolicy,
}

// ---- limits ----

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_input_chars: usize,
    /// Per-pattern bound on backtracking steps.
    pub backtrack_limit: usize,
    pub max_pattern_length: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 52_428_800,
            backtrack_limit: 1_000_000,
            max_pattern_length: MAX_PATTERN_LENGTH,
        }
    }
}

// ---- documents ----

/// File and directory scanning.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Files larger than this are reported as failed without being read.
    pub max_file_bytes: u64,
    /// Upper bound on the text sent to the analyzer in one request. Capped
    /// by `limits.max_input_chars`.
    pub chunk_chars: usize,
    /// Files scanned at once in a directory scan.
    pub max_workers: usize,
    pub recursive: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 100 * 1024 * 1024,
            chunk_chars: 1024 * 1024,
            max_workers: 4,
            recursive: true,
        }
    }
}

// ---- anonymizer ----

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnonymizerConfig {
    pub filler: char,
}

impl Default for AnonymizerConfig {
    fn default() -> Self {
        Self { filler: '*' }
    }
}

// ---- false-positive filter ----

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    pub enabled: bool,
    pub drop_single_char_person: bool,
    pub drop_tech_terms: bool,
    pub drop_short_lowercase_person: bool,
    pub drop_date_time: bool,
    /// Additional PERSON deny-list terms (case-insensitive).
    pub extra_tech_terms: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            drop_single_char_person: true,
            drop_tech_terms: true,
            drop_short_lowercase_person: true,
            drop_date_time: true,
            extra_tech_terms: Vec::new(),
        }
    }
}

impl EngineSettings {
    /// Loads settings from a YAML file and validates them. Environment
    /// overrides are not applied; see [`EngineSettings::load`].
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading engine settings from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: EngineSettings = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        Ok(settings)
    }

    /// Loads settings from `path` (or defaults when `None`), applies
    /// `CNSHIELD_*` overrides and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) => Self::load_from_file(p)?,
            None => Self::default(),
        };
        settings.apply_env_overrides()?;
        settings.validate().context("Invalid settings after environment overrides")?;
        Ok(settings)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yml::to_string(self).context("Failed to serialize settings")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write settings file {}", path.display()))
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides using `lookup` to resolve variable names.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("CNSHIELD_VERIFIER_ENABLED") {
            self.verifier.enabled = parse_bool(&val)
                .with_context(|| format!("CNSHIELD_VERIFIER_ENABLED has invalid value '{val}'"))?;
        }
        if let Some(val) = lookup("CNSHIELD_VERIFIER_MODE") {
            self.verifier.mode = val
                .parse()
                .with_context(|| format!("CNSHIELD_VERIFIER_MODE has invalid value '{val}'"))?;
        }
        if let Some(val) = lookup("CNSHIELD_VERIFIER_API_KEY") {
            self.verifier.api.api_key = Some(val);
        }
        if let Some(val) = lookup("CNSHIELD_VERIFIER_BASE_URL") {
            self.verifier.api.base_url = val;
        }
        if let Some(val) = lookup("CNSHIELD_VERIFIER_MODEL") {
            self.verifier.api.model = val;
        }
        if let Some(val) = lookup("CNSHIELD_HIGH_THRESHOLD") {
            self.scoring.high_confidence_threshold = val
                .trim()
                .parse()
                .with_context(|| format!("CNSHIELD_HIGH_THRESHOLD has invalid value '{val}'"))?;
        }
        if let Some(val) = lookup("CNSHIELD_LOW_THRESHOLD") {
            self.scoring.low_confidence_threshold = val
                .trim()
                .parse()
                .with_context(|| format!("CNSHIELD_LOW_THRESHOLD has invalid value '{val}'"))?;
        }
        if let Some(val) = lookup("CNSHIELD_MAX_INPUT_CHARS") {
            self.limits.max_input_chars = val
                .trim()
                .parse()
                .with_context(|| format!("CNSHIELD_MAX_INPUT_CHARS has invalid value '{val}'"))?;
        }
        debug!("Environment overrides applied.");
        Ok(())
    }

    /// Checks thresholds, window sizes, limits and verifier requirements.
    pub fn validate(&self) -> Result<(), ShieldError> {
        self.scoring.validate()?;

        let v = &self.verifier;
        if !v.score_threshold.is_finite() || !(0.0..=1.0).contains(&v.score_threshold) {
            return Err(ShieldError::InvalidConfig(format!(
                "verifier.score_threshold {} is outside [0, 1]",
                v.score_threshold
            )));
        }
        if v.context_window_chars == 0 {
            return Err(invalid("verifier.context_window_chars must be greater than 0"));
        }
        if v.timeout_ms == 0 {
            return Err(invalid("verifier.timeout_ms must be greater than 0"));
        }
        if v.is_active() && v.mode == VerifierMode::Api {
            if v.api.base_url.trim().is_empty() {
                return Err(invalid("verifier.api.base_url is required when mode = 'api'"));
            }
            if v.api.model.trim().is_empty() {
                return Err(invalid("verifier.api.model is required when mode = 'api'"));
            }
        }
        if let Some(rl) = &v.rate_limit {
            if rl.burst == 0 || !rl.per_second.is_finite() || rl.per_second <= 0.0 {
                return Err(invalid("verifier.rate_limit needs burst > 0 and per_second > 0"));
            }
        }

        let n = &self.nlp;
        if !n.base_score.is_finite() || !(0.0..=1.0).contains(&n.base_score) {
            return Err(ShieldError::InvalidConfig(format!(
                "nlp.base_score {} is outside [0, 1]",
                n.base_score
            )));
        }
        if n.max_concurrency == 0 {
            return Err(invalid("nlp.max_concurrency must be greater than 0"));
        }
        if n.context_window_chars == 0 {
            return Err(invalid("nlp.context_window_chars must be greater than 0"));
        }

        let c = &self.context;
        if c.window_chars == 0 {
            return Err(invalid("context.window_chars must be greater than 0"));
        }
        for (name, v) in [("boost_per_word", c.boost_per_word), ("max_boost", c.max_boost)] {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(ShieldError::InvalidConfig(format!(
                    "context.{name} {v} is outside [0, 1]"
                )));
            }
        }

        let l = &self.limits;
        if l.max_input_chars == 0 || l.backtrack_limit == 0 || l.max_pattern_length == 0 {
            return Err(invalid("limits must all be greater than 0"));
        }

        let d = &self.documents;
        if d.max_file_bytes == 0 || d.chunk_chars == 0 || d.max_workers == 0 {
            return Err(invalid("documents.max_file_bytes, chunk_chars and max_workers must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> ShieldError {
    ShieldError::InvalidConfig(msg.to_string())
}

fn parse_bool(val: &str) -> Result<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{other}'"),
    }
}

/// Default location of the settings file (`<config dir>/cnshield/settings.yaml`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cnshield").join("settings.yaml"))
}

/// Default location of the persisted rule file (`<config dir>/cnshield/rules.yaml`).
pub fn default_rules_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cnshield").join("rules.yaml"))
}
