//! Retry engine.
//!
//! This module provides bounded re-invocation of a fallible async operation:
//! - `RetryPolicy`: immutable backoff configuration
//! - `Retryer`: executes an operation under a policy, honoring cancellation
//! - `classify_error`: advisory retryable / non-retryable classification

pub mod classify;
pub mod policy;
pub mod retryer;

pub use classify::{ErrorClass, RETRYABLE_MESSAGE_PATTERNS, classify_error, classify_message};
pub use policy::{JITTER_FACTOR, RetryPolicy};
pub use retryer::{RetryStats, Retryer};
