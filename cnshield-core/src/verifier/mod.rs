// cnshield-core/src/verifier/mod.rs
//! Verification backends for medium-confidence candidates.
//!
//! A verifier is asked whether a matched value, seen in its surrounding text,
//! really is the sensitive entity the recognizers claim. Backends are
//! interchangeable behind [`Verifier`]; the [`gate`] module decides which
//! candidates are sent and how verdicts are folded back into the results.
//!
//! License: MIT OR APACHE 2.0

use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{VerifierConfig, VerifierMode};
use crate::entity::EntityType;
use crate::errors::ShieldError;

pub mod api;
pub mod gate;
pub mod limiter;
pub mod local;
pub mod mock;
pub mod prompt;

pub use api::ApiVerifier;
pub use gate::{GateReport, VerificationGate};
pub use limiter::{SharedLimiter, VerifierBudget};
pub use local::{LocalModel, LocalVerifier};
pub use mock::MockVerifier;
pub use prompt::{build_context, parse_verdict, render_prompt};

/// What a verifier is asked to judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub entity_type: EntityType,
    /// The matched value.
    pub text: String,
    /// The value with its surroundings, as built by [`build_context`].
    pub context: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    pub fn confirm(reason: impl Into<String>) -> Self {
        Self { confirmed: true, confidence: None, reason: Some(reason.into()) }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self { confirmed: false, confidence: None, reason: Some(reason.into()) }
    }
}

#[async_trait]
pub trait Verifier: Send + Sync {
    fn name(&self) -> &str;

    /// Judges one candidate. Errors are treated as "verifier unavailable" by
    /// the gate and never reach the caller.
    async fn verify(&self, request: &VerificationRequest) -> anyhow::Result<Verdict>;
}

/// Builds the backend selected by `config`, or `None` when verification is off.
///
/// `local` mode needs an in-process model; without one, verification is
/// disabled with a warning rather than failing the registry build.
pub fn build_verifier(
    config: &VerifierConfig,
    local_model: Option<Arc<dyn LocalModel>>,
) -> Result<Option<Arc<dyn Verifier>>, ShieldError> {
    if !config.is_active() {
        return Ok(None);
    }
    let verifier: Arc<dyn Verifier> = match config.mode {
        VerifierMode::Disabled => return Ok(None),
        VerifierMode::Api => Arc::new(ApiVerifier::new(&config.api, config.timeout_ms)?),
        VerifierMode::Local => match local_model {
            Some(model) => Arc::new(LocalVerifier::new(model)),
            None => {
                warn!("Verifier mode is 'local' but no local model is loaded. Verification is disabled.");
                return Ok(None);
            }
        },
        VerifierMode::Mock => Arc::new(MockVerifier::from_config(&config.mock)),
    };
    Ok(Some(verifier))
}
