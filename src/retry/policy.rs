//! Backoff policy.

use std::time::Duration;

/// Jittered delays fall within `base × (1 ± JITTER_FACTOR)`.
pub const JITTER_FACTOR: f64 = 0.25;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Backoff configuration for a [`Retryer`](super::Retryer).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    /// Total invocations, including the first. At least 1.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    /// At least 1.0.
    pub backoff_multiplier: f64,
    /// Never below `initial_delay`.
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Doubling backoff from `initial_delay`, capped at `max_delay`, with jitter.
    pub fn exponential(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay: max_delay.max(initial_delay),
            jitter: true,
        }
    }

    /// Constant `delay` between attempts.
    pub fn linear(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: delay,
            backoff_multiplier: 1.0,
            max_delay: delay,
            jitter: false,
        }
    }

    /// A single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Check the policy invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(format!(
                "backoff_multiplier must be at least 1.0 (got {})",
                self.backoff_multiplier
            ));
        }
        if self.max_delay < self.initial_delay {
            return Err(format!(
                "max_delay ({:?}) cannot be below initial_delay ({:?})",
                self.max_delay, self.initial_delay
            ));
        }
        Ok(())
    }

    /// Clamp every field into range.
    pub fn normalized(mut self) -> Self {
        self.max_attempts = self.max_attempts.max(1);
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            self.backoff_multiplier = 1.0;
        }
        self.max_delay = self.max_delay.max(self.initial_delay);
        self
    }

    /// Un-jittered wait after failed attempt `attempt` (1-based):
    /// `initial_delay × backoff_multiplier^(attempt-1)`, capped at `max_delay`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Apply a jitter `factor` (expected in `[1 - JITTER_FACTOR, 1 + JITTER_FACTOR]`)
    /// to the base delay, still capped at `max_delay`.
    pub fn jittered_delay(&self, attempt: u32, factor: f64) -> Duration {
        let base = self.base_delay(attempt);
        let factor = factor.clamp(1.0 - JITTER_FACTOR, 1.0 + JITTER_FACTOR);
        base.mul_f64(factor).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        let policy = RetryPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert!(policy.jitter);
    }

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::exponential(5, Duration::from_millis(10), Duration::from_millis(100));
        assert_eq!(policy.base_delay(1), Duration::from_millis(10));
        assert_eq!(policy.base_delay(2), Duration::from_millis(20));
        assert_eq!(policy.base_delay(3), Duration::from_millis(40));
        assert_eq!(policy.base_delay(4), Duration::from_millis(80));
        assert_eq!(policy.base_delay(5), Duration::from_millis(100));
    }

    #[test]
    fn test_delay_never_exceeds_max() {
        let policy = RetryPolicy::exponential(50, Duration::from_millis(7), Duration::from_secs(2))
            .with_backoff_multiplier(3.5);
        for attempt in 1..200 {
            assert!(policy.base_delay(attempt) <= policy.max_delay);
            assert!(policy.jittered_delay(attempt, 1.25) <= policy.max_delay);
        }
    }

    #[test]
    fn test_linear_is_constant() {
        let policy = RetryPolicy::linear(4, Duration::from_millis(50));
        for attempt in 1..=4 {
            assert_eq!(policy.base_delay(attempt), Duration::from_millis(50));
        }
        assert!(!policy.jitter);
    }

    #[test]
    fn test_no_retry() {
        let policy = RetryPolicy::no_retry();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay(1), Duration::ZERO);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_constructors_clamp() {
        let policy = RetryPolicy::exponential(0, Duration::from_secs(2), Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.max_delay, Duration::from_secs(2));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut policy = RetryPolicy::default();
        policy.max_attempts = 0;
        assert!(policy.validate().is_err());

        let policy = RetryPolicy::default().with_backoff_multiplier(0.5);
        assert!(policy.validate().is_err());
        assert_eq!(policy.normalized().backoff_multiplier, 1.0);

        let mut policy = RetryPolicy::default();
        policy.max_delay = Duration::from_millis(1);
        assert!(policy.validate().is_err());
        assert!(policy.normalized().validate().is_ok());
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = RetryPolicy::exponential(5, Duration::from_millis(100), Duration::from_secs(10));
        let base = policy.base_delay(2);
        assert_eq!(policy.jittered_delay(2, 0.75), base.mul_f64(0.75));
        assert_eq!(policy.jittered_delay(2, 1.25), base.mul_f64(1.25));
        // Out-of-range factors are clamped to the jitter window
        assert_eq!(policy.jittered_delay(2, 3.0), base.mul_f64(1.25));
    }
}
