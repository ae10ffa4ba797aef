// cnshield/src/main.rs
//! cnshield entry point.
//!
//! Loads `.env`, parses arguments, installs the logger and dispatches to the
//! command implementations.
//! License: MIT OR APACHE 2.0

use clap::Parser;
use log::LevelFilter;
use std::process::ExitCode;

use cnshield::cli::{Cli, Commands};
use cnshield::commands::{self, error_msg, AppContext};
use cnshield::logger;
use cnshield::ui::theme::ThemeStyle;

async fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let ctx = AppContext::load(cli)?;
    match &cli.command {
        Commands::Analyze(cmd) => commands::analyze::run_analyze(&ctx, cmd).await,
        Commands::Anonymize(cmd) => commands::analyze::run_anonymize(&ctx, cmd).await,
        Commands::Rules(cmd) => commands::rules::run_rules(&ctx, cmd),
        Commands::Config(cmd) => commands::config::run_config(&ctx, cmd),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let level = if cli.quiet {
        Some(LevelFilter::Off)
    } else if cli.debug {
        Some(LevelFilter::Debug)
    } else {
        None
    };
    logger::init_logger(level);

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            // The user theme may be what failed to load.
            error_msg(format!("{e:#}"), &ThemeStyle::default_theme_map());
            ExitCode::FAILURE
        }
    }
}
