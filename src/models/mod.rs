//! Data models shared by the pool façade and the hook context.

pub mod connection;
pub mod query;

pub use connection::{ConnectionConfig, ConnectionConfigError, ConnectionInfo, DatabaseType};
pub use query::{BatchResult, ColumnMetadata, ExecuteResult, QueryParam, QueryResult, Statement};
