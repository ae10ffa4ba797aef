//! errors.rs - Custom error types for the cnshield-core library.
//!
//! Only input errors and rule/configuration errors are meant to reach callers.
//! The runtime variants (`Verifier`, `VerifierTimeout`, `Model`, `ModelBusy`)
//! are produced internally and recovered by the pipeline.
//!
//! License: MIT OR APACHE 2.0

use thiserror::Error;

/// This enum represents all possible error types in the `cnshield-core` library.
///
/// By using `#[non_exhaustive]`, we signal to consumers of this library that
/// new variants may be added in future versions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ShieldError {
    #[error("Input is {0} chars long, which exceeds the limit of {1}")]
    InputTooLarge(usize, usize),

    #[error("Invalid rule '{0}': {1}")]
    InvalidRule(String, String),

    #[error("Failed to compile pattern '{0}': {1}")]
    RuleCompilationError(String, Box<fancy_regex::Error>),

    #[error("Rule '{0}': pattern length ({1}) exceeds maximum allowed ({2})")]
    PatternLengthExceeded(String, usize, usize),

    #[error("Rule '{0}' not found")]
    RuleNotFound(String),

    #[error("Rule '{0}' already exists")]
    RuleAlreadyExists(String),

    #[error("Rule '{0}' is a builtin rule and cannot be {1}")]
    BuiltinRuleProtected(String, &'static str),

    #[error("Invalid scoring policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Verifier failed: {0}")]
    Verifier(String),

    #[error("Verifier timed out after {0} ms")]
    VerifierTimeout(u64),

    #[error("Entity extraction model failed: {0}")]
    Model(String),

    #[error("Entity extraction pool is busy")]
    ModelBusy,

    #[error("Failed to read document: {0}")]
    Document(String),

    #[error("Failed to serialize data: {0}")]
    Serialization(String),

    #[error("An unexpected I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("A critical system error occurred: {0}")]
    AnyhowWrapper(#[from] anyhow::Error),
}

impl ShieldError {
    /// Whether the error belongs to the caller-facing taxonomy (bad input, bad
    /// rule, bad configuration) rather than a recoverable runtime failure.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ShieldError::InputTooLarge(..)
                | ShieldError::InvalidRule(..)
                | ShieldError::RuleCompilationError(..)
                | ShieldError::PatternLengthExceeded(..)
                | ShieldError::RuleNotFound(..)
                | ShieldError::RuleAlreadyExists(..)
                | ShieldError::BuiltinRuleProtected(..)
                | ShieldError::InvalidPolicy(..)
                | ShieldError::InvalidConfig(..)
        )
    }
}
