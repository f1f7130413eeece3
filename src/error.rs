//! Error types for the resilience layer.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Every variant maps onto a structured [`ErrorKind`] so callers can branch on the
//! category of a failure without matching on message text.

use crate::hooks::HookType;
use thiserror::Error;

/// Boxed error returned by hooks and third-party collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Structured category of a [`DbError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed caller input. Never retried.
    Validation,
    /// Connection-level failure (refused, reset, TLS, protocol).
    Network,
    Timeout,
    /// Missing node, closed pool, no healthy backend.
    Infrastructure,
    /// The database rejected the statement (syntax, constraint, missing table).
    Query,
    /// A hook halted the pipeline.
    HookChain,
    RetryExhausted,
    Cancelled,
    FailoverExhausted,
    Internal,
    /// Third-party error without a structured kind.
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Infrastructure => "infrastructure",
            Self::Query => "query",
            Self::HookChain => "hook_chain",
            Self::RetryExhausted => "retry_exhausted",
            Self::Cancelled => "cancelled",
            Self::FailoverExhausted => "failover_exhausted",
            Self::Internal => "internal",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error("Connection not found: {connection_id}")]
    ConnectionNotFound { connection_id: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Invalid hook: {message}")]
    InvalidHook { message: String },

    #[error("hook execution failed at {hook_type}: {source}")]
    HookFailed {
        hook_type: HookType,
        #[source]
        source: BoxError,
    },

    #[error("hook requested stop at {hook_type}")]
    HookStopped { hook_type: HookType },

    #[error("retry exhausted after {attempts} attempt(s): {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<DbError>,
    },

    #[error("{operation} cancelled after {attempts} attempt(s)")]
    Cancelled { operation: String, attempts: u32 },

    #[error("failover exhausted after {attempts} attempt(s): {source}")]
    FailoverExhausted {
        attempts: u32,
        #[source]
        source: Box<DbError>,
    },

    #[error("no healthy nodes available")]
    NoHealthyNodes,

    #[error("{message}")]
    Other { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a connection not found error.
    pub fn connection_not_found(connection_id: impl Into<String>) -> Self {
        Self::ConnectionNotFound {
            connection_id: connection_id.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an invalid hook error.
    pub fn invalid_hook(message: impl Into<String>) -> Self {
        Self::InvalidHook {
            message: message.into(),
        }
    }

    /// Create a hook failure wrapping the hook's own error.
    pub fn hook_failed(hook_type: HookType, source: impl Into<BoxError>) -> Self {
        Self::HookFailed {
            hook_type,
            source: source.into(),
        }
    }

    pub fn hook_stopped(hook_type: HookType) -> Self {
        Self::HookStopped { hook_type }
    }

    pub fn retry_exhausted(attempts: u32, last: DbError) -> Self {
        Self::RetryExhausted {
            attempts,
            source: Box::new(last),
        }
    }

    pub fn cancelled(operation: impl Into<String>, attempts: u32) -> Self {
        Self::Cancelled {
            operation: operation.into(),
            attempts,
        }
    }

    pub fn failover_exhausted(attempts: u32, last: DbError) -> Self {
        Self::FailoverExhausted {
            attempts,
            source: Box::new(last),
        }
    }

    /// Wrap a third-party error that carries no structured kind.
    pub fn other(err: impl std::fmt::Display) -> Self {
        Self::Other {
            message: err.to_string(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Structured category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::Network,
            Self::Database { .. } => ErrorKind::Query,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ConnectionNotFound { .. } | Self::NoHealthyNodes => ErrorKind::Infrastructure,
            Self::InvalidInput { .. } | Self::InvalidHook { .. } => ErrorKind::Validation,
            Self::HookFailed { .. } | Self::HookStopped { .. } => ErrorKind::HookChain,
            Self::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::FailoverExhausted { .. } => ErrorKind::FailoverExhausted,
            Self::Other { .. } => ErrorKind::Unknown,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this error is retryable.
    ///
    /// `ResilientPool` stops retrying when this is false; `Retryer::execute`
    /// on its own retries every failure.
    pub fn is_retryable(&self) -> bool {
        crate::retry::classify_error(self).is_retryable()
    }

    /// Check if this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => DbError::database(
                format!("Type not found: {}", type_name),
                None,
                "Check the declared column types",
            ),
            sqlx::Error::ColumnNotFound(col) => DbError::database(
                format!("Column not found: {}", col),
                None,
                "Check the selected column names",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            other => DbError::other(other),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::database(
            "Syntax error",
            Some("42601".to_string()),
            "Check SQL syntax",
        );
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
        assert_eq!(DbError::NoHealthyNodes.suggestion(), None);
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::timeout("query", 30).is_retryable());
        assert!(DbError::connection("err", "sugg").is_retryable());
        assert!(!DbError::invalid_input("empty query").is_retryable());
        assert!(!DbError::database("syntax error", None, "fix it").is_retryable());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(DbError::invalid_hook("empty").kind(), ErrorKind::Validation);
        assert_eq!(
            DbError::hook_stopped(HookType::BeforeQuery).kind(),
            ErrorKind::HookChain
        );
        assert_eq!(
            DbError::retry_exhausted(3, DbError::timeout("query", 1)).kind(),
            ErrorKind::RetryExhausted
        );
        assert_eq!(DbError::cancelled("retry", 1).kind(), ErrorKind::Cancelled);
        assert_eq!(DbError::NoHealthyNodes.kind(), ErrorKind::Infrastructure);
        assert_eq!(DbError::other("boom").kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_hook_failed_carries_source_text() {
        let err = DbError::hook_failed(HookType::BeforeExec, "tenant quota exceeded");
        let msg = err.to_string();
        assert!(msg.contains("hook execution failed"));
        assert!(msg.contains("tenant quota exceeded"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_retry_exhausted_wraps_last_cause() {
        let err = DbError::retry_exhausted(4, DbError::connection("reset by peer", "retry"));
        assert!(err.to_string().contains("4 attempt(s)"));
        match err {
            DbError::RetryExhausted { attempts, source } => {
                assert_eq!(attempts, 4);
                assert!(matches!(*source, DbError::Connection { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_pool_closed_maps_to_connection() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn test_pool_timeout_maps_to_timeout() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::Timeout { .. }));
    }
}
