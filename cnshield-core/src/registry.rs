// cnshield-core/src/registry.rs
//! The recognizer registry.
//!
//! The registry owns the rule set and the engine settings, and publishes an
//! immutable [`RegistrySnapshot`] built from them. Readers clone the current
//! `Arc<RegistrySnapshot>` once per request and use it to the end, so a rule
//! edit or a reload never changes the recognizers under a running request.
//!
//! Writers are serialized by the state mutex. Every mutation validates its
//! input, builds a complete new snapshot and only then swaps it in and commits
//! the new state; a failed build leaves both untouched.
//!
//! Settings updates are staged and take effect on [`RecognizerRegistry::reload`].
//!
//! License: MIT OR APACHE 2.0

use chrono::Utc;
use log::{debug, info};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::sync::Semaphore;

use crate::config::EngineSettings;
use crate::errors::ShieldError;
use crate::filters::FalsePositiveFilter;
use crate::recognizers::{get_or_compile, CompileOptions, EntityExtractor, Recognizer, StatisticalRecognizer};
use crate::rules::{merge_rules, PatternDefinition, RuleDefinition, RuleSource, RuleStore};
use crate::scoring::ScoringPolicy;
use crate::span::CandidateSpan;
use crate::verifier::{build_verifier, limiter, LocalModel, SharedLimiter, VerificationGate, Verifier};

/// A consistent, immutable view of everything one request needs.
pub struct RegistrySnapshot {
    pub version: u64,
    /// Pattern recognizers in rule order, then the statistical recognizer.
    pub recognizers: Vec<Recognizer>,
    pub settings: Arc<EngineSettings>,
    pub gate: VerificationGate,
    pub filter: FalsePositiveFilter,
    /// Bounds concurrent entity extraction across requests on this snapshot.
    pub nlp_permits: Arc<Semaphore>,
}

impl RegistrySnapshot {
    pub fn policy(&self) -> &ScoringPolicy {
        &self.settings.scoring
    }

    pub fn statistical(&self) -> Option<&Arc<StatisticalRecognizer>> {
        self.recognizers.iter().find_map(|r| match r {
            Recognizer::Statistical(s) => Some(s),
            Recognizer::Pattern(_) => None,
        })
    }

    pub fn recognizer_names(&self) -> Vec<&str> {
        self.recognizers.iter().map(Recognizer::name).collect()
    }
}

struct RegistryState {
    rules: RuleStore,
    settings: Arc<EngineSettings>,
    staged: Option<EngineSettings>,
}

pub struct RecognizerRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
    state: Mutex<RegistryState>,
    version: AtomicU64,
    extractor: Option<Arc<dyn EntityExtractor>>,
    verifier: Option<Arc<dyn Verifier>>,
    local_model: Option<Arc<dyn LocalModel>>,
}

/// Collects the optional collaborators before the first snapshot is built.
#[derive(Default)]
pub struct RegistryBuilder {
    settings: EngineSettings,
    rules: Option<RuleStore>,
    extractor: Option<Arc<dyn EntityExtractor>>,
    verifier: Option<Arc<dyn Verifier>>,
    local_model: Option<Arc<dyn LocalModel>>,
}

impl RegistryBuilder {
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the builtin catalog entirely. Use [`merge_rules`] to extend it instead.
    pub fn rules(mut self, rules: RuleStore) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn EntityExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Uses this verifier whenever verification is enabled, whatever the configured mode.
    pub fn verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn local_model(mut self, model: Arc<dyn LocalModel>) -> Self {
        self.local_model = Some(model);
        self
    }

    pub fn build(self) -> Result<RecognizerRegistry, ShieldError> {
        let rules = match self.rules {
            Some(rules) => rules,
            None => RuleStore::load_builtin_rules()?,
        };
        let settings = Arc::new(self.settings);
        let rate_limit = settings.verifier.rate_limit.as_ref().map(limiter::shared);

        // Placeholder until the first build; it seeds the shared budgets.
        let mut registry = RecognizerRegistry {
            current: RwLock::new(Arc::new(RegistrySnapshot {
                version: 0,
                recognizers: Vec::new(),
                settings: Arc::clone(&settings),
                gate: VerificationGate::new(None, &settings.verifier, rate_limit),
                filter: FalsePositiveFilter::new(&settings.filters),
                nlp_permits: Arc::new(Semaphore::new(settings.nlp.max_concurrency)),
            })),
            state: Mutex::new(RegistryState { rules: RuleStore::default(), settings: Arc::clone(&settings), staged: None }),
            version: AtomicU64::new(0),
            extractor: self.extractor,
            verifier: self.verifier,
            local_model: self.local_model,
        };

        let snapshot = registry.build_snapshot(&rules, &settings)?;
        registry.current = RwLock::new(Arc::new(snapshot));
        registry.state = Mutex::new(RegistryState { rules, settings, staged: None });
        Ok(registry)
    }
}

impl RecognizerRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// A registry over the builtin catalog with the given settings.
    pub fn new(settings: EngineSettings) -> Result<Self, ShieldError> {
        Self::builder().settings(settings).build()
    }

    /// The current snapshot. Hold on to it for the duration of one request.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        let current = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&current)
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn build_snapshot(&self, rules: &RuleStore, settings: &Arc<EngineSettings>) -> Result<RegistrySnapshot, ShieldError> {
        settings.validate()?;

        let selection = &settings.recognizers;
        let active = rules.active_rules(&selection.enabled, &selection.disabled);
        let mut recognizers = Vec::with_capacity(active.len() + 1);
        for rule in active {
            let options = CompileOptions::from_settings(settings, settings.context.extra_words(&rule.entity_type));
            recognizers.push(Recognizer::Pattern(get_or_compile(rule, &options)?));
        }

        if settings.nlp.enabled {
            match &self.extractor {
                Some(extractor) => {
                    let statistical = StatisticalRecognizer::new(Arc::clone(extractor), &settings.nlp, &settings.context)?;
                    recognizers.push(Recognizer::Statistical(Arc::new(statistical)));
                }
                None => debug!("NLP is enabled but no entity extractor is attached; running regex recognizers only."),
            }
        }

        let verifier = match &self.verifier {
            Some(v) if settings.verifier.enabled => Some(Arc::clone(v)),
            _ => build_verifier(&settings.verifier, self.local_model.clone())?,
        };
        let (nlp_permits, rate_limit) = self.carried_budgets(settings);

        Ok(RegistrySnapshot {
            version: self.version.fetch_add(1, Ordering::SeqCst) + 1,
            recognizers,
            settings: Arc::clone(settings),
            gate: VerificationGate::new(verifier, &settings.verifier, rate_limit),
            filter: FalsePositiveFilter::new(&settings.filters),
            nlp_permits,
        })
    }

    /// The extraction permits and verifier budget for the next snapshot.
    ///
    /// Both carry over from the current snapshot unless their own settings
    /// changed, so requests still running on an older snapshot keep counting
    /// against the same bounds.
    fn carried_budgets(&self, settings: &EngineSettings) -> (Arc<Semaphore>, Option<SharedLimiter>) {
        let current = self.snapshot();

        let permits = if current.settings.nlp.max_concurrency == settings.nlp.max_concurrency {
            Arc::clone(&current.nlp_permits)
        } else {
            debug!(
                "nlp.max_concurrency changed from {} to {}; new extraction permits.",
                current.settings.nlp.max_concurrency, settings.nlp.max_concurrency
            );
            Arc::new(Semaphore::new(settings.nlp.max_concurrency))
        };

        let budget = match (&settings.verifier.rate_limit, current.gate.limiter()) {
            (None, _) => None,
            (Some(config), Some(existing)) if existing.follows(config) => Some(Arc::clone(existing)),
            (Some(config), _) => {
                debug!("verifier.rate_limit changed; starting a full budget.");
                Some(limiter::shared(config))
            }
        };
        (permits, budget)
    }

    fn publish(&self, snapshot: RegistrySnapshot) -> u64 {
        let version = snapshot.version;
        let mut current = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Arc::new(snapshot);
        info!("Published registry snapshot v{}.", version);
        version
    }

    /// Builds from `rules` under the live settings and, on success, commits
    /// them and publishes.
    fn commit_rules(&self, state: &mut RegistryState, rules: RuleStore) -> Result<u64, ShieldError> {
        let snapshot = self.build_snapshot(&rules, &state.settings)?;
        state.rules = rules;
        Ok(self.publish(snapshot))
    }

    // ---- rule management ----

    pub fn list_rules(&self) -> Vec<RuleDefinition> {
        self.lock_state().rules.rules.clone()
    }

    pub fn get_rule(&self, name: &str) -> Option<RuleDefinition> {
        self.lock_state().rules.get(name).cloned()
    }

    /// Adds a custom rule. The name must not exist yet.
    pub fn create_rule(&self, mut rule: RuleDefinition) -> Result<u64, ShieldError> {
        let mut state = self.lock_state();
        if state.rules.contains(&rule.name) {
            return Err(ShieldError::RuleAlreadyExists(rule.name));
        }
        rule.source = RuleSource::Custom;
        rule.updated_at = Some(Utc::now());
        rule.validate(state.settings.limits.max_pattern_length)?;

        let mut rules = state.rules.clone();
        info!("Creating custom rule '{}'.", rule.name);
        rules.rules.push(rule);
        self.commit_rules(&mut state, rules)
    }

    /// Replaces the rule called `name`. Builtin rules keep their name and
    /// source; custom rules may be renamed to a free name.
    pub fn update_rule(&self, name: &str, mut rule: RuleDefinition) -> Result<u64, ShieldError> {
        let mut state = self.lock_state();
        let existing = state.rules.get(name).ok_or_else(|| ShieldError::RuleNotFound(name.to_string()))?;
        if rule.name != name {
            if existing.is_builtin() {
                return Err(ShieldError::BuiltinRuleProtected(name.to_string(), "renamed"));
            }
            if state.rules.contains(&rule.name) {
                return Err(ShieldError::RuleAlreadyExists(rule.name));
            }
        }
        rule.source = existing.source;
        rule.updated_at = Some(Utc::now());
        rule.validate(state.settings.limits.max_pattern_length)?;

        let mut rules = state.rules.clone();
        if let Some(slot) = rules.get_mut(name) {
            *slot = rule;
        }
        info!("Updating rule '{}'.", name);
        self.commit_rules(&mut state, rules)
    }

    /// Removes a custom rule.
    pub fn delete_rule(&self, name: &str) -> Result<u64, ShieldError> {
        let mut state = self.lock_state();
        match state.rules.get(name) {
            None => return Err(ShieldError::RuleNotFound(name.to_string())),
            Some(rule) if rule.is_builtin() => {
                return Err(ShieldError::BuiltinRuleProtected(name.to_string(), "deleted"))
            }
            Some(_) => {}
        }
        let mut rules = state.rules.clone();
        rules.rules.retain(|r| r.name != name);
        info!("Deleting custom rule '{}'.", name);
        self.commit_rules(&mut state, rules)
    }

    pub fn set_rule_enabled(&self, name: &str, enabled: bool) -> Result<u64, ShieldError> {
        let mut state = self.lock_state();
        let mut rules = state.rules.clone();
        let rule = rules.get_mut(name).ok_or_else(|| ShieldError::RuleNotFound(name.to_string()))?;
        if rule.enabled == enabled {
            return Ok(self.version());
        }
        rule.enabled = enabled;
        rule.updated_at = Some(Utc::now());
        debug!("Rule '{}' enabled = {}.", name, enabled);
        self.commit_rules(&mut state, rules)
    }

    /// Checks that a regex would be accepted in a rule.
    pub fn validate_regex(&self, regex: &str) -> Result<(), ShieldError> {
        let max = self.lock_state().settings.limits.max_pattern_length;
        let check = RuleDefinition::custom(
            "regex_check",
            crate::entity::EntityType::Custom("REGEX_CHECK".into()),
            vec![PatternDefinition { name: "pattern".into(), regex: regex.to_string(), score: 0.5 }],
        );
        check.validate(max)
    }

    /// Runs one rule alone over `text`: validators and context boost apply,
    /// nothing else does. Disabled rules can be tested too.
    pub fn test_rule(&self, name: &str, text: &str) -> Result<Vec<CandidateSpan>, ShieldError> {
        let (rule, settings) = {
            let state = self.lock_state();
            let rule = state.rules.get(name).cloned().ok_or_else(|| ShieldError::RuleNotFound(name.to_string()))?;
            (rule, Arc::clone(&state.settings))
        };
        let chars = text.chars().count();
        if chars > settings.limits.max_input_chars {
            return Err(ShieldError::InputTooLarge(chars, settings.limits.max_input_chars));
        }
        let options = CompileOptions::from_settings(&settings, settings.context.extra_words(&rule.entity_type));
        let recognizer = Recognizer::Pattern(get_or_compile(&rule, &options)?);
        recognizer.produce(text, 0)
    }

    // ---- settings ----

    /// The live settings (what the current snapshot was built with).
    pub fn settings(&self) -> Arc<EngineSettings> {
        Arc::clone(&self.lock_state().settings)
    }

    pub fn staged_settings(&self) -> Option<EngineSettings> {
        self.lock_state().staged.clone()
    }

    /// Validates and stages new settings. Nothing changes until [`reload`](Self::reload).
    pub fn update_settings(&self, settings: EngineSettings) -> Result<(), ShieldError> {
        settings.validate()?;
        self.lock_state().staged = Some(settings);
        debug!("Settings staged; call reload() to apply.");
        Ok(())
    }

    /// Promotes staged settings (if any) and rebuilds the snapshot.
    pub fn reload(&self) -> Result<u64, ShieldError> {
        let mut state = self.lock_state();
        let settings = match state.staged.clone() {
            Some(staged) => Arc::new(staged),
            None => Arc::clone(&state.settings),
        };
        let snapshot = self.build_snapshot(&state.rules, &settings)?;
        state.settings = settings;
        state.staged = None;
        Ok(self.publish(snapshot))
    }

    // ---- persistence ----

    /// Rules worth persisting: every custom rule, plus builtin rules that
    /// differ from the embedded catalog.
    pub fn persistable_rules(&self) -> Result<RuleStore, ShieldError> {
        let catalog = RuleStore::load_builtin_rules()?;
        let state = self.lock_state();
        let rules = state
            .rules
            .rules
            .iter()
            .filter(|rule| match catalog.get(&rule.name) {
                Some(original) if rule.is_builtin() => {
                    let mut current = (*rule).clone();
                    current.updated_at = original.updated_at;
                    &current != original
                }
                _ => true,
            })
            .cloned()
            .collect();
        Ok(RuleStore { rules })
    }

    pub fn save_rules<P: AsRef<Path>>(&self, path: P) -> Result<(), ShieldError> {
        self.persistable_rules()?.save_to_file(path)?;
        Ok(())
    }

    /// Loads a rule file, merges it over the builtin catalog and publishes.
    pub fn load_rules<P: AsRef<Path>>(&self, path: P) -> Result<u64, ShieldError> {
        let user = RuleStore::load_from_file(path)?;
        let merged = merge_rules(RuleStore::load_builtin_rules()?, Some(user));
        let mut state = self.lock_state();
        self.commit_rules(&mut state, merged)
    }
}
