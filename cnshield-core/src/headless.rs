// cnshield-core/src/headless.rs
//! `headless.rs`
//! One-shot blocking wrappers for callers without an async runtime.
//!
//! Each call builds a registry from the given settings and rules and drives a
//! single request on a private current-thread runtime. Do not call these from
//! inside an async context; use [`Analyzer`] there instead.
//!
//! License: MIT OR APACHE 2.0

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::analyzer::{AnalysisReport, AnalyzeOptions, Analyzer, AnonymizedText};
use crate::config::EngineSettings;
use crate::registry::RecognizerRegistry;
use crate::rules::{merge_rules, RuleStore};

fn build_analyzer(settings: EngineSettings, user_rules: Option<RuleStore>) -> Result<Analyzer> {
    let rules = merge_rules(RuleStore::load_builtin_rules()?, user_rules);
    let registry = RecognizerRegistry::builder()
        .settings(settings)
        .rules(rules)
        .build()
        .context("Failed to build recognizer registry")?;
    Ok(Analyzer::new(Arc::new(registry)))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start a runtime for headless analysis")
}

/// Detects entities in `text` with the builtin catalog plus `user_rules`.
pub fn headless_analyze(
    settings: EngineSettings,
    user_rules: Option<RuleStore>,
    text: &str,
    options: &AnalyzeOptions,
) -> Result<AnalysisReport> {
    let analyzer = build_analyzer(settings, user_rules)?;
    Ok(runtime()?.block_on(analyzer.analyze(text, options))?)
}

pub fn headless_anonymize(
    settings: EngineSettings,
    user_rules: Option<RuleStore>,
    text: &str,
    options: &AnalyzeOptions,
) -> Result<AnonymizedText> {
    let analyzer = build_analyzer(settings, user_rules)?;
    Ok(runtime()?.block_on(analyzer.anonymize(text, options))?)
}

/// Returns only the masked text.
pub fn headless_anonymize_string(settings: EngineSettings, text: &str) -> Result<String> {
    Ok(headless_anonymize(settings, None, text, &AnalyzeOptions::default())?.text)
}
