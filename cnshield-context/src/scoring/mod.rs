// cnshield-context/src/scoring/mod.rs

use libm::round;

/// Weights for the context boost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostPolicy {
    /// Added once per distinct context word in the window.
    pub per_word: f64,
    /// Upper bound on the total boost.
    pub max_boost: f64,
}

impl Default for BoostPolicy {
    fn default() -> Self {
        Self {
            per_word: 0.1,
            max_boost: 0.4,
        }
    }
}

impl BoostPolicy {
    /// Total boost for `hits` distinct context words. Monotonic in `hits`.
    pub fn boost(&self, hits: usize) -> f64 {
        let raw = hits as f64 * self.per_word.max(0.0);
        raw.min(self.max_boost.max(0.0))
    }

    /// `min(1.0, raw_score + boost)`, clamped and rounded.
    pub fn apply(&self, raw_score: f64, hits: usize) -> f64 {
        clamp_score(raw_score + self.boost(hits))
    }
}

/// Clamps a score into `[0, 1]` and rounds it to four decimals so that sums
/// like `0.5 + 0.1` compare equal to their literal. NaN maps to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    round_score(score.clamp(0.0, 1.0))
}

pub fn round_score(score: f64) -> f64 {
    round(score * 10_000.0) / 10_000.0
}
