// cnshield-core/src/verifier/limiter.rs
//! Rate budget for verifier calls.
//!
//! A [`VerifierBudget`] is a token bucket tied to the [`RateLimitConfig`] it
//! was built from. The registry passes the same budget to every snapshot it
//! publishes and starts a fresh one only when `verifier.rate_limit` itself
//! changes, so publishing a snapshot never refills the bucket.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

#[derive(Debug)]
struct Bucket {
    available: f64,
    checked_at: Instant,
}

#[derive(Debug)]
pub struct VerifierBudget {
    config: RateLimitConfig,
    bucket: Mutex<Bucket>,
}

impl VerifierBudget {
    /// Starts with a full burst.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            bucket: Mutex::new(Bucket { available: f64::from(config.burst), checked_at: Instant::now() }),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether this budget was built from `config`.
    pub fn follows(&self, config: &RateLimitConfig) -> bool {
        self.config == *config
    }

    /// Takes one call from the budget. `false` means the caller must not call
    /// the verifier now.
    pub async fn try_take(&self) -> bool {
        let mut bucket = self.bucket.lock().await;
        let now = Instant::now();
        let earned = now.saturating_duration_since(bucket.checked_at).as_secs_f64() * self.config.per_second;
        bucket.available = (bucket.available + earned).min(f64::from(self.config.burst));
        bucket.checked_at = now;

        if bucket.available >= 1.0 {
            bucket.available -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole calls available right now, without taking any.
    pub async fn available(&self) -> u32 {
        let bucket = self.bucket.lock().await;
        let earned = Instant::now().saturating_duration_since(bucket.checked_at).as_secs_f64() * self.config.per_second;
        (bucket.available + earned).min(f64::from(self.config.burst)).floor() as u32
    }
}

pub type SharedLimiter = Arc<VerifierBudget>;

pub fn shared(config: &RateLimitConfig) -> SharedLimiter {
    Arc::new(VerifierBudget::new(*config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_budget_drains_and_refills() {
        let budget = VerifierBudget::new(RateLimitConfig { burst: 2, per_second: 1.0 });
        assert!(budget.try_take().await);
        assert!(budget.try_take().await);
        assert!(!budget.try_take().await);

        tokio::time::advance(Duration::from_millis(1_100)).await;
        assert_eq!(budget.available().await, 1);
        assert!(budget.try_take().await);
        assert!(!budget.try_take().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_never_exceeds_burst() {
        let budget = VerifierBudget::new(RateLimitConfig { burst: 3, per_second: 10.0 });
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(budget.available().await, 3);
    }

    #[test]
    fn test_budget_follows_its_config() {
        let config = RateLimitConfig { burst: 5, per_second: 2.0 };
        let budget = shared(&config);
        assert!(budget.follows(&config));
        assert!(!budget.follows(&RateLimitConfig { burst: 5, per_second: 3.0 }));
        assert_eq!(budget.config().burst, 5);
    }
}
