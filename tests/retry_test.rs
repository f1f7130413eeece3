//! Integration tests for the retry engine.
//!
//! Tests verify that:
//! - Exponential backoff waits the expected total time
//! - One retryer can be shared by concurrent callers
//! - Cancellation interrupts a waiting retry loop

use db_resilience::{DbError, RetryPolicy, Retryer};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn network_error() -> DbError {
    DbError::connection("connection reset by peer", "Check network connectivity")
}

#[tokio::test]
async fn test_exponential_backoff_two_failures_then_success() {
    let policy = RetryPolicy::exponential(3, Duration::from_millis(10), Duration::from_millis(100))
        .with_jitter(false);
    let retryer = Retryer::new(policy);
    let calls = AtomicU32::new(0);
    let cancel = CancellationToken::new();

    let start = Instant::now();
    let result = retryer
        .execute(&cancel, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 { Err(network_error()) } else { Ok(n) }
        })
        .await;
    let elapsed = start.elapsed();

    assert_eq!(result.unwrap(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // 10ms after the first failure, 20ms after the second
    assert!(elapsed >= Duration::from_millis(30), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(500), "elapsed {elapsed:?}");

    let stats = retryer.stats();
    assert_eq!(stats.total_attempts, 3);
    assert_eq!(stats.successful_ops, 1);
    assert_eq!(stats.total_retries, 2);
    assert!(stats.last_retry_time.is_some());
}

#[tokio::test]
async fn test_shared_retryer_across_tasks() {
    let retryer = Arc::new(Retryer::new(RetryPolicy::linear(2, Duration::from_millis(1))));
    let mut handles = Vec::new();

    for i in 0..8u32 {
        let retryer = Arc::clone(&retryer);
        handles.push(tokio::spawn(async move {
            let cancel = CancellationToken::new();
            let calls = AtomicU32::new(0);
            retryer
                .execute(&cancel, || async {
                    // Odd tasks fail once before succeeding
                    if i % 2 == 1 && calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(network_error())
                    } else {
                        Ok(i)
                    }
                })
                .await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    let stats = retryer.stats();
    assert_eq!(stats.successful_ops, 8);
    assert_eq!(stats.failed_ops, 0);
    assert_eq!(stats.total_attempts, 12);
    assert_eq!(stats.total_retries, 4);
    assert!((stats.average_retries - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_cancel_from_another_task() {
    let retryer = Retryer::new(RetryPolicy::linear(10, Duration::from_secs(5)));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = retryer
        .execute(&cancel, || async { Err::<(), _>(network_error()) })
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(retryer.stats().failed_ops, 1);
}

#[tokio::test]
async fn test_execute_if_returns_caller_error_unwrapped() {
    let retryer = Retryer::new(RetryPolicy::linear(5, Duration::from_millis(1)));
    let cancel = CancellationToken::new();
    let calls = AtomicU32::new(0);

    let err = retryer
        .execute_if(
            &cancel,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(DbError::database("syntax error near FROM", None, "Fix the SQL"))
            },
            DbError::is_retryable,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Database { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
