// cnshield/src/logger.rs
//! Logger setup for the CLI.
//!
//! Log lines go to stderr so they never mix with masked output on stdout.
//! `RUST_LOG` selects the level unless `level` forces one.
//! License: MIT OR APACHE 2.0

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.format_timestamp(None).target(Target::Stderr);
    // A second init (e.g. from tests) keeps the first logger.
    let _ = builder.try_init();
}
