//! Retryable-error classification.
//!
//! Structured error kinds are authoritative. The message table below is only
//! consulted for errors that arrived without a structured kind.

use crate::error::{DbError, ErrorKind};

/// Lowercase substrings marking an untyped error message as transient.
pub const RETRYABLE_MESSAGE_PATTERNS: &[&str] = &[
    "connection",
    "timeout",
    "network",
    "temporary",
    "unavailable",
    "circuit breaker",
    "rate limit",
    "throttle",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    NonRetryable,
}

impl ErrorClass {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::Retryable)
    }
}

/// Classify `err` for callers deciding whether to retry.
pub fn classify_error(err: &DbError) -> ErrorClass {
    match err {
        // An unknown node id does not appear by waiting
        DbError::ConnectionNotFound { .. } => return ErrorClass::NonRetryable,
        // A failover round is worth repeating only if its last node error is
        DbError::FailoverExhausted { source, .. } => return classify_error(source),
        _ => {}
    }

    match err.kind() {
        ErrorKind::Network
        | ErrorKind::Timeout
        | ErrorKind::Infrastructure
        | ErrorKind::FailoverExhausted => ErrorClass::Retryable,
        ErrorKind::Unknown => classify_message(&err.to_string()),
        ErrorKind::Validation
        | ErrorKind::Query
        | ErrorKind::HookChain
        | ErrorKind::RetryExhausted
        | ErrorKind::Cancelled
        | ErrorKind::Internal => ErrorClass::NonRetryable,
    }
}

/// Substring fallback over [`RETRYABLE_MESSAGE_PATTERNS`].
pub fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if RETRYABLE_MESSAGE_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
    {
        ErrorClass::Retryable
    } else {
        ErrorClass::NonRetryable
    }
}
