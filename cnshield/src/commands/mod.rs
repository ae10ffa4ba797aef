// cnshield/src/commands/mod.rs
//! Command implementations and the state they share.
//! License: MIT OR APACHE 2.0

pub mod analyze;
pub mod config;
pub mod rules;

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use log::debug;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cnshield_core::{default_config_path, default_rules_path, AnalyzeOptions, EngineSettings, EntityType, RecognizerRegistry};

use crate::cli::{Cli, InputArgs};
use crate::ui::output_format;
use crate::ui::theme::{build_theme_map, ThemeMap};

/// Resolved settings, file locations and presentation options for one run.
pub struct AppContext {
    pub settings: EngineSettings,
    pub settings_path: Option<PathBuf>,
    pub rules_path: Option<PathBuf>,
    pub theme: ThemeMap,
    pub quiet: bool,
}

impl AppContext {
    /// Loads settings (explicit path, else the per-user file when present, else
    /// defaults), applies `CNSHIELD_*` overrides and builds the theme.
    pub fn load(cli: &Cli) -> Result<Self> {
        let settings_path = cli
            .settings
            .clone()
            .or_else(|| default_config_path().filter(|p| p.exists()));
        debug!("Using settings file: {:?}", settings_path);
        let settings = EngineSettings::load(settings_path.as_deref())?;
        let theme = build_theme_map(cli.theme.as_deref()).context("Theme error")?;
        Ok(Self {
            settings,
            settings_path,
            rules_path: cli.rules.clone().or_else(default_rules_path),
            theme,
            quiet: cli.quiet,
        })
    }

    /// A registry over the builtin catalog plus the rule file, when it exists.
    pub fn registry(&self) -> Result<Arc<RecognizerRegistry>> {
        let registry = RecognizerRegistry::new(self.settings.clone()).context("Failed to build recognizer registry")?;
        if let Some(path) = self.rules_path.as_deref().filter(|p| p.exists()) {
            registry
                .load_rules(path)
                .with_context(|| format!("Failed to load rules from {}", path.display()))?;
        }
        Ok(Arc::new(registry))
    }

    /// Persists custom and edited builtin rules to the rule file.
    pub fn save_rules(&self, registry: &RecognizerRegistry) -> Result<&Path> {
        let path = self
            .rules_path
            .as_deref()
            .context("No rule file location is known; pass --rules <FILE>")?;
        registry
            .save_rules(path)
            .with_context(|| format!("Failed to save rules to {}", path.display()))?;
        Ok(path)
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if !self.quiet {
            info_msg(msg, &self.theme);
        }
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        if !self.quiet {
            let color = io::stderr().is_terminal();
            let _ = output_format::print_success_message(&mut io::stderr(), msg.as_ref(), &self.theme, color);
        }
    }
}

/// Helper for printing info messages to stderr.
pub fn info_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_info_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Helper for printing error messages to stderr.
pub fn error_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_error_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Helper for printing warning messages to stderr.
pub fn warn_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_warn_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Reads the input text from `--text`, `--input-file` or stdin, in that order.
pub fn read_input(args: &InputArgs) -> Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(path) = &args.input_file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()));
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read from stdin")?;
    Ok(buffer)
}

pub fn analyze_options(args: &InputArgs) -> Result<AnalyzeOptions> {
    let entities = args
        .entities
        .iter()
        .filter(|e| !e.trim().is_empty())
        .map(|e| e.parse::<EntityType>().with_context(|| format!("Unknown entity type '{e}'")))
        .collect::<Result<Vec<_>>>()?;
    Ok(AnalyzeOptions {
        entities,
        verify: if args.no_verify { Some(false) } else { None },
    })
}
