// cnshield/src/cli.rs
//! This file defines the command-line interface (CLI) for the cnshield application,
//! including all available commands and their arguments.
//! License: MIT OR APACHE 2.0

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "cnshield",
    author = "Relay",
    version = env!("CARGO_PKG_VERSION"),
    about = "Detect, score and mask China-specific personal data in text",
    long_about = "cnshield finds resident ID numbers, phone numbers, bank cards, licence plates, credentials and other China-specific sensitive data in free text. Each finding carries a confidence score built from pattern strength, checksum validation and surrounding context words; uncertain findings can be confirmed by a verifier before they are reported or masked.",
    arg_required_else_help = true,
)]
pub struct Cli {
    /// Disable informational messages
    #[arg(long, short = 'q', global = true, help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    /// Enable debug logging (overrides RUST_LOG to DEBUG)
    #[arg(long, short = 'd', global = true, help = "Enable debug logging.")]
    pub debug: bool,

    /// Engine settings file. Falls back to the per-user settings file when it exists.
    #[arg(long = "settings", short = 's', value_name = "FILE", global = true, env = "CNSHIELD_SETTINGS", help = "Path to an engine settings file (YAML).")]
    pub settings: Option<PathBuf>,

    /// Rule file holding custom and edited builtin rules.
    #[arg(long = "rules", short = 'r', value_name = "FILE", global = true, env = "CNSHIELD_RULES", help = "Path to the rule file (YAML) that rule edits are saved to.")]
    pub rules: Option<PathBuf>,

    /// Specify the path to a custom YAML theme file.
    #[arg(long = "theme", value_name = "FILE", global = true, help = "Specify the path to a custom YAML theme file.")]
    pub theme: Option<PathBuf>,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// All available commands for the `cnshield` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detects sensitive entities and reports them with their scores.
    #[command(about = "Detect sensitive entities and report them with their scores.")]
    Analyze(AnalyzeCommand),

    /// Masks detected entities and prints the rewritten text.
    #[command(about = "Mask detected entities and print the rewritten text.")]
    Anonymize(AnonymizeCommand),

    /// Inspects and edits the recognizer rules.
    #[command(subcommand, about = "Inspect and edit the recognizer rules.")]
    Rules(RulesCommand),

    /// Shows or checks engine settings.
    #[command(subcommand, about = "Show or check engine settings.")]
    Config(ConfigCommand),
}

/// Input and filtering arguments shared by `analyze` and `anonymize`.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Path to an input file (reads from stdin if neither this nor --text is given).
    #[arg(long, short = 'i', value_name = "FILE", conflicts_with = "text", help = "Read input from a specified file instead of stdin.")]
    pub input_file: Option<PathBuf>,

    /// Inline input text.
    #[arg(long, short = 't', value_name = "TEXT", help = "Analyze this text instead of reading stdin.")]
    pub text: Option<String>,

    /// Only report these entity types (comma-separated, e.g. PHONE,ID_CARD).
    #[arg(long, short = 'e', value_delimiter = ',', help = "Only report these entity types (comma-separated).")]
    pub entities: Vec<String>,

    /// Skip the verifier for this run.
    #[arg(long = "no-verify", help = "Skip the verifier for this run, accepting uncertain findings.")]
    pub no_verify: bool,
}

/// Arguments for the `analyze` command.
#[derive(Parser, Debug)]
pub struct AnalyzeCommand {
    #[command(flatten)]
    pub input: InputArgs,

    /// Scan a document or a directory of documents (.txt, .log, .md, .csv, .tsv, .json, .jsonl, ...).
    #[arg(long, short = 'f', value_name = "PATH", conflicts_with_all = ["text", "input_file"], help = "Scan a document or every supported document in a directory.")]
    pub file: Option<PathBuf>,

    /// Only scan the top level of a directory given to --file.
    #[arg(long = "no-recursive", requires = "file", help = "Do not descend into subdirectories of --file.")]
    pub no_recursive: bool,

    /// Save the JSON risk report of a --file scan.
    #[arg(long, value_name = "FILE", requires = "file", help = "Write the JSON risk report of a --file scan to this path.")]
    pub report: Option<PathBuf>,

    /// Print the full report as JSON to stdout.
    #[arg(long = "json", help = "Print the full analysis report as JSON.")]
    pub json: bool,

    /// Exit with a non-zero code if the number of findings exceeds this threshold.
    #[arg(long = "fail-over-threshold", value_name = "N", help = "Exit with a non-zero code if the number of findings exceeds this threshold.")]
    pub fail_over_threshold: Option<usize>,
}

/// Arguments for the `anonymize` command.
#[derive(Parser, Debug)]
pub struct AnonymizeCommand {
    #[command(flatten)]
    pub input: InputArgs,

    /// Write masked output to this file instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE", help = "Write output to a specified file instead of stdout.")]
    pub output: Option<PathBuf>,

    /// Print the masked text, results and masked spans as JSON.
    #[arg(long = "json", help = "Print the masked text, results and masked spans as JSON.")]
    pub json: bool,

    /// Suppress the masking summary.
    #[arg(long = "no-summary", help = "Suppress the masking summary printed to stderr.")]
    pub no_summary: bool,
}

/// Subcommands for the `rules` command.
#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    #[command(about = "List all rules with their status.")]
    List {
        #[arg(long = "json", help = "Print the rules as JSON.")]
        json: bool,
    },
    #[command(about = "Show one rule as YAML.")]
    Show {
        #[arg(value_name = "NAME")]
        name: String,
    },
    #[command(about = "Run a single rule over a sample text and show its raw findings.")]
    Test {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "TEXT")]
        text: String,
    },
    #[command(about = "Add a custom rule from a YAML file.")]
    Add {
        #[arg(long = "file", short = 'f', value_name = "FILE", help = "YAML file with one rule definition.")]
        file: PathBuf,
    },
    #[command(about = "Replace a rule with a definition from a YAML file.")]
    Update {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(long = "file", short = 'f', value_name = "FILE", help = "YAML file with one rule definition.")]
        file: PathBuf,
    },
    #[command(about = "Delete a custom rule.")]
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },
    #[command(about = "Enable a rule.")]
    Enable {
        #[arg(value_name = "NAME")]
        name: String,
    },
    #[command(about = "Disable a rule.")]
    Disable {
        #[arg(value_name = "NAME")]
        name: String,
    },
    #[command(name = "validate-regex", about = "Check that a regular expression is accepted as a rule pattern.")]
    ValidateRegex {
        #[arg(value_name = "REGEX")]
        regex: String,
    },
}

/// Subcommands for the `config` command.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    #[command(about = "Print the effective settings as YAML.")]
    Show,
    #[command(about = "Validate a settings file (the active one when FILE is omitted).")]
    Validate {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}
