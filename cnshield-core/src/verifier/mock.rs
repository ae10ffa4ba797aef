// cnshield-core/src/verifier/mock.rs
//! A scripted verifier for tests and `mode: mock`.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::MockVerifierConfig;
use crate::verifier::{Verdict, VerificationRequest, Verifier};

#[derive(Debug, Default)]
pub struct MockVerifier {
    confirm: bool,
    reason: Option<String>,
    delay: Option<Duration>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockVerifier {
    pub fn confirming() -> Self {
        Self { confirm: true, ..Self::default() }
    }

    pub fn rejecting() -> Self {
        Self { confirm: false, ..Self::default() }
    }

    /// Every call returns an error.
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn from_config(config: &MockVerifierConfig) -> Self {
        Self { confirm: config.confirm, reason: config.reason.clone(), ..Self::default() }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sleeps before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Verifier for MockVerifier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn verify(&self, _request: &VerificationRequest) -> Result<Verdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            bail!("mock verifier configured to fail");
        }
        Ok(Verdict { confirmed: self.confirm, confidence: None, reason: self.reason.clone() })
    }
}
