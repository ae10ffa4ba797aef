// cnshield-core/src/recognizers/compiler.rs
//! compiler.rs - Compiles rule definitions into pattern recognizers and caches them.
//!
//! Compilation is keyed by a hash of the rule's matching fields together with
//! the compile options, so rebuilding a snapshot after a toggle or an edit to
//! one rule reuses every other compiled recognizer.
//!
//! License: MIT OR APACHE 2.0

use cnshield_context::{BoostPolicy, ContextMatcher};
use fancy_regex::RegexBuilder;
use lazy_static::lazy_static;
use log::debug;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use crate::config::{EngineSettings, ValidatorFailurePolicy};
use crate::errors::ShieldError;
use crate::recognizers::pattern::{CompiledPattern, PatternRecognizer};
use crate::rules::RuleDefinition;

/// Entries beyond this are dropped wholesale before the next insert.
const MAX_CACHE_ENTRIES: usize = 1024;

lazy_static! {
    /// A thread-safe, global cache for compiled recognizers.
    static ref COMPILED_RECOGNIZER_CACHE: RwLock<HashMap<u64, Arc<PatternRecognizer>>> =
        RwLock::new(HashMap::new());
}

/// Settings that affect how a rule compiles, beyond the rule itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub backtrack_limit: usize,
    pub max_pattern_length: usize,
    pub window_chars: usize,
    pub boost: BoostPolicy,
    pub validator_failure: ValidatorFailurePolicy,
    /// Context words added on top of the rule's own list.
    pub extra_context: Vec<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::from_settings(&EngineSettings::default(), &[])
    }
}

impl Hash for CompileOptions {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.backtrack_limit.hash(state);
        self.max_pattern_length.hash(state);
        self.window_chars.hash(state);
        self.boost.per_word.to_bits().hash(state);
        self.boost.max_boost.to_bits().hash(state);
        self.validator_failure.hash(state);
        self.extra_context.hash(state);
    }
}

impl CompileOptions {
    pub fn from_settings(settings: &EngineSettings, extra_context: &[String]) -> Self {
        Self {
            backtrack_limit: settings.limits.backtrack_limit,
            max_pattern_length: settings.limits.max_pattern_length,
            window_chars: settings.context.window_chars,
            boost: settings.context.boost_policy(),
            validator_failure: settings.recognizers.validator_failure,
            extra_context: extra_context.to_vec(),
        }
    }
}

fn cache_key(rule: &RuleDefinition, options: &CompileOptions) -> u64 {
    let mut hasher = DefaultHasher::new();
    rule.hash(&mut hasher);
    options.hash(&mut hasher);
    hasher.finish()
}

/// Validates and compiles one rule. This is the low-level function that
/// performs the actual regex compilation.
pub fn compile_rule(rule: &RuleDefinition, options: &CompileOptions) -> Result<PatternRecognizer, ShieldError> {
    rule.validate(options.max_pattern_length)?;
    debug!("Compiling rule '{}' with {} patterns.", rule.name, rule.patterns.len());

    let mut patterns = Vec::with_capacity(rule.patterns.len());
    for pattern in &rule.patterns {
        let regex = RegexBuilder::new(&pattern.regex)
            .backtrack_limit(options.backtrack_limit)
            .build()
            .map_err(|e| ShieldError::RuleCompilationError(format!("{}/{}", rule.name, pattern.name), Box::new(e)))?;
        patterns.push(CompiledPattern {
            name: pattern.name.clone(),
            regex,
            score: pattern.score,
        });
    }

    let words = rule.context.iter().chain(options.extra_context.iter());
    let context = ContextMatcher::new(words)
        .map_err(|e| ShieldError::InvalidRule(rule.name.clone(), format!("context words: {e}")))?;

    Ok(PatternRecognizer {
        name: rule.name.clone(),
        entity_type: rule.entity_type.clone(),
        patterns,
        context,
        validator: rule.validator,
        window_chars: options.window_chars,
        boost: options.boost,
        validator_failure: options.validator_failure,
    })
}

/// Gets a compiled recognizer from the cache or compiles it if not found.
pub fn get_or_compile(rule: &RuleDefinition, options: &CompileOptions) -> Result<Arc<PatternRecognizer>, ShieldError> {
    let key = cache_key(rule, options);

    {
        let cache = COMPILED_RECOGNIZER_CACHE
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(compiled) = cache.get(&key) {
            debug!("Serving rule '{}' from compile cache.", rule.name);
            return Ok(Arc::clone(compiled));
        }
    }

    let compiled = Arc::new(compile_rule(rule, options)?);

    let mut cache = COMPILED_RECOGNIZER_CACHE
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if cache.len() >= MAX_CACHE_ENTRIES {
        debug!("Compile cache full, clearing {} entries.", cache.len());
        cache.clear();
    }
    cache.insert(key, Arc::clone(&compiled));
    Ok(compiled)
}
