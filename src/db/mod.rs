//! Database access layer.
//!
//! This module provides database access functionality:
//! - Connection pool management per node
//! - Statement execution with per-statement timeouts
//! - Row decoding into JSON values
//! - Database dispatch macros for reducing code duplication
//! - The resilient pool façade wiring hooks, retry and failover together

pub mod decode;
pub mod executor;
#[macro_use]
pub mod macros;
pub mod params;
pub mod pool;
pub mod resilient;

pub use decode::RowToJson;
pub use executor::QueryExecutor;
pub use pool::{ConnectionManager, DbConnection, DbPool, PoolStats};
pub use resilient::{PooledConnection, ResilientPool};
