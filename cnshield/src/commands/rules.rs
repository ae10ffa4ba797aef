// cnshield/src/commands/rules.rs
//! The `rules` subcommands. Every edit is validated by the registry before it
//! is saved to the rule file.
//! License: MIT OR APACHE 2.0

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use cnshield_core::RuleDefinition;

use crate::cli::RulesCommand;
use crate::commands::AppContext;
use crate::ui::tables;

/// Reads one rule definition from a YAML file.
pub fn read_rule_file(path: &Path) -> Result<RuleDefinition> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rule file {}", path.display()))?;
    serde_yml::from_str(&text).with_context(|| format!("Failed to parse rule definition in {}", path.display()))
}

pub fn run_rules(ctx: &AppContext, cmd: &RulesCommand) -> Result<ExitCode> {
    let registry = ctx.registry()?;
    let stdout = io::stdout();
    let color = stdout.is_terminal();
    let mut out = stdout.lock();

    match cmd {
        RulesCommand::List { json } => {
            let rules = registry.list_rules();
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&rules)?)?;
            } else {
                writeln!(out, "{}", tables::rules_table(&rules, &ctx.theme, color))?;
            }
        }
        RulesCommand::Show { name } => {
            let rule = registry
                .get_rule(name)
                .with_context(|| format!("Rule '{name}' not found"))?;
            write!(out, "{}", serde_yml::to_string(&rule).context("Failed to serialize rule")?)?;
        }
        RulesCommand::Test { name, text } => {
            let spans = registry.test_rule(name, text)?;
            if spans.is_empty() {
                ctx.info(format!("Rule '{name}' found nothing."));
            } else {
                writeln!(out, "{}", tables::candidates_table(&spans, &ctx.theme, color))?;
            }
        }
        RulesCommand::Add { file } => {
            let rule = read_rule_file(file)?;
            let name = rule.name.clone();
            let version = registry.create_rule(rule)?;
            let path = ctx.save_rules(&registry)?;
            ctx.success(format!("Added rule '{name}' (snapshot v{version}); saved to {}.", path.display()));
        }
        RulesCommand::Update { name, file } => {
            let rule = read_rule_file(file)?;
            let version = registry.update_rule(name, rule)?;
            let path = ctx.save_rules(&registry)?;
            ctx.success(format!("Updated rule '{name}' (snapshot v{version}); saved to {}.", path.display()));
        }
        RulesCommand::Delete { name } => {
            registry.delete_rule(name)?;
            let path = ctx.save_rules(&registry)?;
            ctx.success(format!("Deleted rule '{name}'; saved to {}.", path.display()));
        }
        RulesCommand::Enable { name } | RulesCommand::Disable { name } => {
            let enabled = matches!(cmd, RulesCommand::Enable { .. });
            registry.set_rule_enabled(name, enabled)?;
            let path = ctx.save_rules(&registry)?;
            let state = if enabled { "enabled" } else { "disabled" };
            ctx.success(format!("Rule '{name}' {state}; saved to {}.", path.display()));
        }
        RulesCommand::ValidateRegex { regex } => {
            registry.validate_regex(regex)?;
            ctx.success("The pattern is valid.");
        }
    }
    Ok(ExitCode::SUCCESS)
}
