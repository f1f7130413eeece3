//! Resilience layer for SQL connection pools.
//!
//! This library wraps sqlx pools (SQLite, PostgreSQL, MySQL) with:
//! - a hook pipeline fired at every lifecycle point of an operation
//! - a retry engine with exponential or linear backoff and jitter
//! - a failover coordinator that routes work to the first healthy node
//!
//! [`ResilientPool`] composes the three; each can also be used on its own.

pub mod config;
pub mod db;
pub mod error;
pub mod failover;
pub mod hooks;
pub mod models;
pub mod retry;

pub use config::ResilienceConfig;
pub use db::{ConnectionManager, PooledConnection, ResilientPool};
pub use error::{DbError, DbResult, ErrorKind};
pub use failover::{FailoverConfig, FailoverCoordinator, FailoverStats};
pub use hooks::{ExecutionContext, Hook, HookRegistry, HookResult, HookType, Operation};
pub use retry::{RetryPolicy, RetryStats, Retryer};
