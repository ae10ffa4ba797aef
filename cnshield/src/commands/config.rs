// cnshield/src/commands/config.rs
//! The `config` subcommands.
//! License: MIT OR APACHE 2.0

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::process::ExitCode;

use cnshield_core::EngineSettings;

use crate::cli::ConfigCommand;
use crate::commands::AppContext;

/// Settings as YAML with the API key masked.
pub fn render_settings(settings: &EngineSettings) -> Result<String> {
    let mut shown = settings.clone();
    if shown.verifier.api.api_key.is_some() {
        shown.verifier.api.api_key = Some("[REDACTED]".to_string());
    }
    serde_yml::to_string(&shown).context("Failed to serialize settings")
}

pub fn run_config(ctx: &AppContext, cmd: &ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => {
            match &ctx.settings_path {
                Some(path) => ctx.info(format!("Settings from {} with environment overrides.", path.display())),
                None => ctx.info("Default settings with environment overrides."),
            }
            write!(io::stdout().lock(), "{}", render_settings(&ctx.settings)?)?;
        }
        ConfigCommand::Validate { file } => {
            match file {
                Some(path) => {
                    EngineSettings::load_from_file(path)?;
                    ctx.success(format!("{} is valid.", path.display()));
                }
                // The active settings were validated while loading.
                None => ctx.success("The active settings are valid."),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_is_never_printed() {
        let mut settings = EngineSettings::default();
        settings.verifier.api.api_key = Some("sk-live-123".into());
        let yaml = render_settings(&settings).unwrap();
        assert!(!yaml.contains("sk-live-123"));
        assert!(yaml.contains("[REDACTED]"));
        assert!(yaml.contains("high_confidence_threshold: 0.7"));
    }
}
