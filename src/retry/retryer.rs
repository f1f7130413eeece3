//! Retry executor.

use crate::error::{DbError, DbResult};
use crate::retry::policy::{JITTER_FACTOR, RetryPolicy};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Snapshot of a retryer's counters.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct RetryStats {
    /// Invocations of the wrapped operation, across all calls.
    pub total_attempts: u64,
    pub successful_ops: u64,
    pub failed_ops: u64,
    /// Invocations beyond the first, across all calls.
    pub total_retries: u64,
    /// `total_retries / (successful_ops + failed_ops)`.
    pub average_retries: f64,
    pub last_retry_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Counters {
    total_attempts: u64,
    successful_ops: u64,
    failed_ops: u64,
    total_retries: u64,
    last_retry_time: Option<DateTime<Utc>>,
}

/// Re-invokes a fallible operation under a [`RetryPolicy`].
///
/// The policy can be swapped with [`set_policy`](Self::set_policy) at any time;
/// calls already in flight keep the policy they started with.
pub struct Retryer {
    policy: RwLock<RetryPolicy>,
    rng: Mutex<StdRng>,
    counters: Mutex<Counters>,
}

impl Retryer {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_rng(policy, StdRng::from_entropy())
    }

    /// Use an explicit randomness source for jitter.
    pub fn with_rng(policy: RetryPolicy, rng: StdRng) -> Self {
        Self {
            policy: RwLock::new(policy.normalized()),
            rng: Mutex::new(rng),
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Current policy.
    pub fn policy(&self) -> RetryPolicy {
        *self.policy.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the policy for subsequent calls.
    pub fn set_policy(&self, policy: RetryPolicy) -> DbResult<()> {
        policy.validate().map_err(DbError::invalid_input)?;
        *self.policy.write().unwrap_or_else(PoisonError::into_inner) = policy;
        debug!(
            max_attempts = policy.max_attempts,
            initial_delay_ms = policy.initial_delay.as_millis() as u64,
            "Retry policy replaced"
        );
        Ok(())
    }

    /// Wait after failed attempt `attempt` under the current policy, jitter included.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let policy = self.policy();
        self.delay_with(&policy, attempt)
    }

    fn delay_with(&self, policy: &RetryPolicy, attempt: u32) -> Duration {
        if !policy.jitter {
            return policy.base_delay(attempt);
        }
        let factor = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range((1.0 - JITTER_FACTOR)..=(1.0 + JITTER_FACTOR));
        policy.jittered_delay(attempt, factor)
    }

    /// Run `operation` until it succeeds or the policy's attempts are used up.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, operation: F) -> DbResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        self.execute_with_callback(cancel, operation, |_, _| {})
            .await
    }

    /// Like [`execute`](Self::execute), calling `on_failure(attempt, &err)` after every
    /// failed attempt (1-based), before waiting.
    pub async fn execute_with_callback<T, F, Fut, C>(
        &self,
        cancel: &CancellationToken,
        operation: F,
        on_failure: C,
    ) -> DbResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<T>>,
        C: FnMut(u32, &DbError),
    {
        self.run(cancel, operation, on_failure, |_| true).await
    }

    /// Like [`execute`](Self::execute), but a failure for which `retry_if` returns
    /// false ends the call at once and is returned unwrapped.
    pub async fn execute_if<T, F, Fut, P>(
        &self,
        cancel: &CancellationToken,
        operation: F,
        retry_if: P,
    ) -> DbResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<T>>,
        P: Fn(&DbError) -> bool,
    {
        self.run(cancel, operation, |_, _| {}, retry_if).await
    }

    async fn run<T, F, Fut, C, P>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
        mut on_failure: C,
        retry_if: P,
    ) -> DbResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<T>>,
        C: FnMut(u32, &DbError),
        P: Fn(&DbError) -> bool,
    {
        let policy = self.policy();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                self.record(attempt, false);
                warn!(attempts = attempt, "Retry cancelled before attempt");
                return Err(DbError::cancelled("retry", attempt));
            }

            attempt += 1;
            let err = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempts = attempt, "Operation succeeded after retry");
                    }
                    self.record(attempt, true);
                    return Ok(value);
                }
                Err(err) => err,
            };

            on_failure(attempt, &err);

            if !retry_if(&err) {
                debug!(attempts = attempt, error = %err, "Error not retried");
                self.record(attempt, false);
                return Err(err);
            }

            if attempt >= policy.max_attempts {
                warn!(
                    attempts = attempt,
                    error = %err,
                    "Retry attempts exhausted"
                );
                self.record(attempt, false);
                return Err(DbError::retry_exhausted(attempt, err));
            }

            let delay = self.delay_with(&policy, attempt);
            debug!(
                attempt = attempt,
                max_attempts = policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Attempt failed, waiting before retry"
            );
            self.mark_retry();

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.record(attempt, false);
                    warn!(attempts = attempt, "Retry cancelled during backoff");
                    return Err(DbError::cancelled("retry", attempt));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Counters accumulated since creation or the last reset.
    pub fn stats(&self) -> RetryStats {
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let ops = counters.successful_ops + counters.failed_ops;
        RetryStats {
            total_attempts: counters.total_attempts,
            successful_ops: counters.successful_ops,
            failed_ops: counters.failed_ops,
            total_retries: counters.total_retries,
            average_retries: if ops == 0 {
                0.0
            } else {
                counters.total_retries as f64 / ops as f64
            },
            last_retry_time: counters.last_retry_time,
        }
    }

    pub fn reset_stats(&self) {
        *self.counters.lock().unwrap_or_else(PoisonError::into_inner) = Counters::default();
    }

    fn record(&self, attempts: u32, success: bool) {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters.total_attempts += attempts as u64;
        counters.total_retries += attempts.saturating_sub(1) as u64;
        if success {
            counters.successful_ops += 1;
        } else {
            counters.failed_ops += 1;
        }
    }

    fn mark_retry(&self) {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters.last_retry_time = Some(Utc::now());
    }
}

impl Default for Retryer {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl std::fmt::Debug for Retryer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retryer")
            .field("policy", &self.policy())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::exponential(max_attempts, Duration::from_millis(1), Duration::from_millis(4))
            .with_jitter(false)
    }

    #[tokio::test]
    async fn test_succeeds_after_two_failures() {
        let retryer = Retryer::new(fast_policy(3));
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();

        let result = retryer
            .execute(&token, || {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(DbError::connection("reset", "retry"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let stats = retryer.stats();
        assert_eq!(stats.successful_ops, 1);
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.total_retries, 2);
        assert!(stats.last_retry_time.is_some());
    }

    #[tokio::test]
    async fn test_exhausted_wraps_last_error() {
        let retryer = Retryer::new(fast_policy(4));
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();

        let result: DbResult<()> = retryer
            .execute(&token, || {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    Err(DbError::timeout(format!("attempt {n}"), 1))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(DbError::RetryExhausted { attempts, source }) => {
                assert_eq!(attempts, 4);
                assert!(source.to_string().contains("attempt 4"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(retryer.stats().failed_ops, 1);
    }

    #[tokio::test]
    async fn test_no_retry_runs_once() {
        let retryer = Retryer::new(RetryPolicy::no_retry());
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();

        let result: DbResult<()> = retryer
            .execute(&token, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(DbError::other("boom")) }
            })
            .await;

        assert!(matches!(result, Err(DbError::RetryExhausted { attempts: 1, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_callback_sees_each_failure() {
        let retryer = Retryer::new(fast_policy(3));
        let token = CancellationToken::new();
        let mut seen = Vec::new();

        let _: DbResult<()> = retryer
            .execute_with_callback(
                &token,
                || async { Err(DbError::connection("refused", "retry")) },
                |attempt, err| seen.push((attempt, err.kind())),
            )
            .await;

        let attempts: Vec<u32> = seen.iter().map(|(a, _)| *a).collect();
        assert_eq!(attempts, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_execute_if_stops_on_rejected_error() {
        let retryer = Retryer::new(fast_policy(5));
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result: DbResult<()> = retryer
            .execute_if(
                &token,
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        if n == 1 {
                            Err(DbError::connection("reset", "retry"))
                        } else {
                            Err(DbError::database("syntax error", None, "fix the query"))
                        }
                    }
                },
                DbError::is_retryable,
            )
            .await;

        assert!(matches!(result, Err(DbError::Database { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(retryer.stats().failed_ops, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let retryer = Retryer::new(fast_policy(3));
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);

        let result: DbResult<()> = retryer
            .execute(&token, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert!(matches!(result, Err(DbError::Cancelled { attempts: 0, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let retryer = Arc::new(Retryer::new(
            RetryPolicy::linear(5, Duration::from_secs(60)),
        ));
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let task = {
            let retryer = Arc::clone(&retryer);
            let token = token.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                retryer
                    .execute(&token, || {
                        let calls = Arc::clone(&calls);
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Err::<(), _>(DbError::connection("down", "retry"))
                        }
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
        let result = task.await.unwrap();

        assert!(matches!(result, Err(DbError::Cancelled { attempts: 1, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_jittered_delay_within_window() {
        let policy = RetryPolicy::exponential(10, Duration::from_millis(100), Duration::from_secs(60));
        let retryer = Retryer::with_rng(policy, StdRng::seed_from_u64(7));
        for attempt in 1..=8 {
            let base = policy.base_delay(attempt);
            for _ in 0..50 {
                let delay = retryer.delay_for(attempt);
                assert!(delay >= base.mul_f64(0.75), "{delay:?} < 0.75 × {base:?}");
                assert!(delay <= base.mul_f64(1.25), "{delay:?} > 1.25 × {base:?}");
                assert!(delay <= policy.max_delay);
            }
        }
    }

    #[test]
    fn test_set_policy_validates() {
        let retryer = Retryer::default();
        let mut bad = RetryPolicy::default();
        bad.max_attempts = 0;
        assert!(matches!(
            retryer.set_policy(bad),
            Err(DbError::InvalidInput { .. })
        ));

        retryer.set_policy(RetryPolicy::no_retry()).unwrap();
        assert_eq!(retryer.policy().max_attempts, 1);
    }

    #[tokio::test]
    async fn test_policy_snapshot_per_call() {
        let retryer = Arc::new(Retryer::new(fast_policy(3)));
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result: DbResult<()> = retryer
            .execute(&token, || {
                // Swapping mid-flight must not shorten this call
                let _ = retryer.set_policy(RetryPolicy::no_retry());
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(DbError::connection("flaky", "retry")) }
            })
            .await;

        assert!(matches!(result, Err(DbError::RetryExhausted { attempts: 3, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(retryer.policy().max_attempts, 1);
    }

    #[tokio::test]
    async fn test_average_retries() {
        let retryer = Retryer::new(fast_policy(2));
        let token = CancellationToken::new();
        let _: DbResult<()> = retryer
            .execute(&token, || async { Err(DbError::other("x")) })
            .await;
        let _ = retryer.execute(&token, || async { Ok(()) }).await;

        let stats = retryer.stats();
        assert_eq!(stats.total_retries, 1);
        assert_eq!(stats.average_retries, 0.5);

        retryer.reset_stats();
        assert_eq!(retryer.stats(), RetryStats::default());
    }
}
