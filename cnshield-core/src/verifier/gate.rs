// cnshield-core/src/verifier/gate.rs
//! The verification gate.
//!
//! Candidates that cleared the low threshold but not the high one, and that
//! score below the verifier's own threshold, are sent to the verifier. Calls
//! run concurrently, each under its own timeout. A confirmation marks the
//! result verified, a rejection drops it, and any failure (error, timeout,
//! rate limit) keeps the result unverified.
//!
//! All calls live in one `JoinSet` owned by the future returned from
//! [`VerificationGate::verify_all`]; dropping that future aborts them.
//!
//! License: MIT OR APACHE 2.0

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use crate::config::VerifierConfig;
use crate::span::ResolvedResult;
use crate::text::CharIndexMapper;
use crate::verifier::limiter::SharedLimiter;
use crate::verifier::prompt::build_context;
use crate::verifier::{VerificationRequest, Verifier};

#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Confirmed(Option<String>),
    Rejected,
    Failed,
    /// Not sent: the rate limit was exhausted.
    Skipped,
}

/// Results that survived the gate plus per-outcome counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateReport {
    pub results: Vec<ResolvedResult>,
    pub confirmed: usize,
    pub rejected: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct VerificationGate {
    verifier: Option<Arc<dyn Verifier>>,
    score_threshold: f64,
    window_chars: usize,
    timeout: Duration,
    limiter: Option<SharedLimiter>,
}

impl VerificationGate {
    pub fn new(verifier: Option<Arc<dyn Verifier>>, config: &VerifierConfig, limiter: Option<SharedLimiter>) -> Self {
        Self {
            verifier,
            score_threshold: config.score_threshold,
            window_chars: config.context_window_chars,
            timeout: Duration::from_millis(config.timeout_ms),
            limiter,
        }
    }

    /// A gate that accepts every candidate unverified.
    pub fn disabled() -> Self {
        Self::new(None, &VerifierConfig::default(), None)
    }

    pub fn is_active(&self) -> bool {
        self.verifier.is_some()
    }

    /// The rate budget shared by every snapshot with the same rate limit.
    pub fn limiter(&self) -> Option<&SharedLimiter> {
        self.limiter.as_ref()
    }

    pub fn verifier_name(&self) -> Option<&str> {
        self.verifier.as_deref().map(|v| v.name())
    }

    /// Whether a candidate with this score is sent to the verifier. Candidates
    /// at or above the verifier threshold are accepted as they are.
    pub fn needs_verification(&self, score: f64) -> bool {
        self.is_active() && score < self.score_threshold
    }

    /// Verifies `candidates` against `text` and folds the verdicts back in.
    /// Input order is preserved in the returned results.
    pub async fn verify_all(&self, text: &str, candidates: Vec<ResolvedResult>) -> GateReport {
        let Some(verifier) = &self.verifier else {
            return GateReport { results: candidates, ..GateReport::default() };
        };
        if candidates.is_empty() {
            return GateReport::default();
        }

        let mapper = CharIndexMapper::new(text);
        let mut outcomes: Vec<Outcome> = vec![Outcome::Failed; candidates.len()];
        let mut tasks = JoinSet::new();

        for (idx, candidate) in candidates.iter().enumerate() {
            if let Some(limiter) = &self.limiter {
                if !limiter.try_take().await {
                    outcomes[idx] = Outcome::Skipped;
                    continue;
                }
            }

            let (start, end) = (mapper.to_byte(candidate.start), mapper.to_byte(candidate.end));
            let request = VerificationRequest {
                entity_type: candidate.entity_type.clone(),
                text: text.get(start..end).unwrap_or_default().to_string(),
                context: build_context(text, start, end, self.window_chars),
                score: candidate.score,
            };
            let verifier = Arc::clone(verifier);
            let timeout = self.timeout;

            tasks.spawn(async move {
                let outcome = match tokio::time::timeout(timeout, verifier.verify(&request)).await {
                    Ok(Ok(verdict)) if verdict.confirmed => Outcome::Confirmed(verdict.reason),
                    Ok(Ok(_)) => Outcome::Rejected,
                    Ok(Err(e)) => {
                        warn!(
                            target: "cnshield_core::verifier",
                            "Verifier '{}' failed for a {} candidate: {:#}. Keeping it unverified.",
                            verifier.name(), request.entity_type, e
                        );
                        Outcome::Failed
                    }
                    Err(_) => {
                        warn!(
                            target: "cnshield_core::verifier",
                            "Verifier '{}' timed out after {} ms for a {} candidate. Keeping it unverified.",
                            verifier.name(), timeout.as_millis(), request.entity_type
                        );
                        Outcome::Failed
                    }
                };
                (idx, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, outcome)) => outcomes[idx] = outcome,
                Err(e) => warn!(target: "cnshield_core::verifier", "Verification task ended abnormally: {}", e),
            }
        }

        let mut report = GateReport::default();
        for (mut result, outcome) in candidates.into_iter().zip(outcomes) {
            match outcome {
                Outcome::Confirmed(reason) => {
                    report.confirmed += 1;
                    result.verified = true;
                    result.verification_reason = reason;
                    report.results.push(result);
                }
                Outcome::Rejected => {
                    report.rejected += 1;
                    debug!(
                        target: "cnshield_core::verifier",
                        "Verifier rejected {} at [{}, {}).",
                        result.entity_type, result.start, result.end
                    );
                }
                Outcome::Failed => {
                    report.failed += 1;
                    report.results.push(result);
                }
                Outcome::Skipped => {
                    report.skipped += 1;
                    report.results.push(result);
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RateLimitConfig, VerifierMode};
    use crate::entity::EntityType;
    use crate::span::test_span;
    use crate::verifier::limiter;
    use crate::verifier::{MockVerifier, Verdict};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    const TEXT: &str = "联系人张三，电话13812345678";

    fn phone_candidate() -> ResolvedResult {
        let mut r = test_span(EntityType::Phone, 8, 19, 0.6).into_result();
        r.recognizer = "cn_phone".into();
        r
    }

    fn config(timeout_ms: u64) -> VerifierConfig {
        VerifierConfig { enabled: true, mode: VerifierMode::Mock, timeout_ms, ..VerifierConfig::default() }
    }

    fn gate(verifier: Arc<dyn Verifier>, timeout_ms: u64) -> VerificationGate {
        VerificationGate::new(Some(verifier), &config(timeout_ms), None)
    }

    #[test]
    fn test_threshold_routing() {
        let g = gate(Arc::new(MockVerifier::confirming()), 1_000);
        assert!(g.needs_verification(0.6));
        assert!(!g.needs_verification(0.7));
        assert!(!VerificationGate::disabled().needs_verification(0.1));
    }

    #[test_log::test(tokio::test)]
    async fn test_confirm_marks_verified() {
        let mock = Arc::new(MockVerifier::confirming().with_reason("真实手机号"));
        let report = gate(mock.clone(), 1_000).verify_all(TEXT, vec![phone_candidate()]).await;
        assert_eq!(report.confirmed, 1);
        assert_eq!(report.results.len(), 1);
        assert!(report.results[0].verified);
        assert_eq!(report.results[0].verification_reason.as_deref(), Some("真实手机号"));
        assert_eq!(report.results[0].score, 0.6);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reject_drops() {
        let report = gate(Arc::new(MockVerifier::rejecting()), 1_000)
            .verify_all(TEXT, vec![phone_candidate()])
            .await;
        assert_eq!(report.rejected, 1);
        assert!(report.results.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_failure_fails_open() {
        let report = gate(Arc::new(MockVerifier::failing()), 1_000)
            .verify_all(TEXT, vec![phone_candidate()])
            .await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.results.len(), 1);
        assert!(!report.results[0].verified);
        assert!(report.results[0].verification_reason.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_open() {
        let slow = Arc::new(MockVerifier::confirming().with_delay(Duration::from_secs(5)));
        let report = gate(slow, 100).verify_all(TEXT, vec![phone_candidate()]).await;
        assert_eq!(report.failed, 1);
        assert!(!report.results[0].verified);
    }

    #[tokio::test]
    async fn test_rate_limit_skips_but_keeps() {
        let mock = Arc::new(MockVerifier::rejecting());
        let bucket = limiter::shared(&RateLimitConfig { burst: 1, per_second: 0.0 });
        let g = VerificationGate::new(Some(mock.clone()), &config(1_000), Some(bucket));
        let mut second = phone_candidate();
        second.start = 3;
        second.end = 5;
        second.entity_type = EntityType::Person;

        let report = g.verify_all(TEXT, vec![phone_candidate(), second]).await;
        assert_eq!(mock.call_count(), 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].entity_type, EntityType::Person);
    }

    struct Slow {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Verifier for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn verify(&self, _request: &VerificationRequest) -> anyhow::Result<Verdict> {
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(Verdict::confirm("late"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_the_future_cancels_calls() {
        let finished = Arc::new(AtomicBool::new(false));
        let g = gate(Arc::new(Slow { finished: finished.clone() }), 10_000);

        let attempt = tokio::time::timeout(Duration::from_millis(50), g.verify_all(TEXT, vec![phone_candidate()])).await;
        assert!(attempt.is_err());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
