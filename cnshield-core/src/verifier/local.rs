// cnshield-core/src/verifier/local.rs
//! In-process verifier backed by a locally loaded model.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::verifier::prompt::{parse_verdict, render_prompt};
use crate::verifier::{Verdict, VerificationRequest, Verifier};

/// A local text-generation model. Called from blocking worker threads.
pub trait LocalModel: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

pub struct LocalVerifier {
    model: Arc<dyn LocalModel>,
}

impl LocalVerifier {
    pub fn new(model: Arc<dyn LocalModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Verifier for LocalVerifier {
    fn name(&self) -> &str {
        "local"
    }

    async fn verify(&self, request: &VerificationRequest) -> Result<Verdict> {
        let prompt = render_prompt(request)?;
        let model = Arc::clone(&self.model);
        let reply = tokio::task::spawn_blocking(move || model.generate(&prompt))
            .await
            .context("Local verifier task panicked")??;
        parse_verdict(&reply)
    }
}
