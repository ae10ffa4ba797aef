// cnshield/src/lib.rs
//! # cnshield CLI Application
//!
//! This crate provides the command-line front end for the cnshield engine:
//! `analyze` and `anonymize` over files or stdin, rule management backed by a
//! YAML rule file, and settings inspection.
//!
//! License: MIT OR APACHE 2.0

pub mod cli;
pub mod commands;
pub mod logger;
pub mod ui;
