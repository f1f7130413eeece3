//! Statement execution on a pooled connection.
//!
//! Each backend gets a module with the same functions, generated from one
//! template so the three stay in step:
//! - `fetch`: run a row-returning statement
//! - `execute`: run a write statement
//! - `run_statements`: run statements in order, stopping at the first failure
//! - `transaction`: `run_statements` inside BEGIN/COMMIT, rolled back on failure
//! - `ping`: round-trip check

use crate::db::decode::rows_to_result;
use crate::db::params::bind_param;
use crate::db::pool::DbConnection;
use crate::error::{DbError, DbResult};
use crate::models::{BatchResult, ExecuteResult, QueryParam, QueryResult, Statement};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs statements with a per-statement timeout.
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor {
    timeout: Duration,
}

impl QueryExecutor {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn fetch(
        &self,
        conn: &mut DbConnection,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<QueryResult> {
        debug!(sql = %sql, params = params.len(), "Executing query");
        let limit = self.timeout;
        crate::impl_db_dispatch!(DbConnection, conn, {
            MySql(c) => mysql::fetch(c, sql, params, limit).await,
            Postgres(c) => postgres::fetch(c, sql, params, limit).await,
            SQLite(c) => sqlite::fetch(c, sql, params, limit).await,
        })
    }

    pub async fn execute(
        &self,
        conn: &mut DbConnection,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<ExecuteResult> {
        debug!(sql = %sql, params = params.len(), "Executing write");
        let limit = self.timeout;
        crate::impl_db_dispatch!(DbConnection, conn, {
            MySql(c) => mysql::execute(c, sql, params, limit).await,
            Postgres(c) => postgres::execute(c, sql, params, limit).await,
            SQLite(c) => sqlite::execute(c, sql, params, limit).await,
        })
    }

    /// Run `statements` in order without a transaction.
    pub async fn batch(
        &self,
        conn: &mut DbConnection,
        statements: &[Statement],
    ) -> DbResult<BatchResult> {
        debug!(statements = statements.len(), "Executing batch");
        let start = Instant::now();
        let limit = self.timeout;
        let results = crate::impl_db_dispatch!(DbConnection, conn, {
            MySql(c) => mysql::run_statements(c, statements, limit).await,
            Postgres(c) => postgres::run_statements(c, statements, limit).await,
            SQLite(c) => sqlite::run_statements(c, statements, limit).await,
        })?;
        Ok(BatchResult {
            results,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Run `statements` atomically.
    pub async fn transaction(
        &self,
        conn: &mut DbConnection,
        statements: &[Statement],
    ) -> DbResult<BatchResult> {
        debug!(statements = statements.len(), "Executing transaction");
        let start = Instant::now();
        let limit = self.timeout;
        let results = crate::impl_db_dispatch!(DbConnection, conn, {
            MySql(c) => mysql::transaction(c, statements, limit).await,
            Postgres(c) => postgres::transaction(c, statements, limit).await,
            SQLite(c) => sqlite::transaction(c, statements, limit).await,
        })?;
        Ok(BatchResult {
            results,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    pub async fn ping(&self, conn: &mut DbConnection) -> DbResult<()> {
        let limit = self.timeout;
        crate::impl_db_dispatch!(DbConnection, conn, {
            MySql(c) => mysql::ping(c, limit).await,
            Postgres(c) => postgres::ping(c, limit).await,
            SQLite(c) => sqlite::ping(c, limit).await,
        })
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn timeout_error(operation: &str, limit: Duration) -> DbError {
    DbError::timeout(operation, limit.as_secs() as u32)
}

macro_rules! backend_executor {
    ($name:ident, $db:ty, $conn:ty, $last_id:expr) => {
        mod $name {
            use super::*;

            pub async fn fetch(
                conn: &mut $conn,
                sql: &str,
                params: &[QueryParam],
                limit: Duration,
            ) -> DbResult<QueryResult> {
                let start = Instant::now();
                // Unparameterized SQL goes through the simple protocol
                let rows = if params.is_empty() {
                    timeout(limit, sqlx::Executor::fetch_all(&mut *conn, sql)).await
                } else {
                    let mut query = sqlx::query::<$db>(sql);
                    for param in params {
                        query = bind_param(query, param);
                    }
                    timeout(limit, query.fetch_all(&mut *conn)).await
                };

                match rows {
                    Ok(Ok(rows)) => Ok(rows_to_result(&rows, start)),
                    Ok(Err(e)) => Err(DbError::from(e)),
                    Err(_) => Err(timeout_error("query execution", limit)),
                }
            }

            pub async fn execute(
                conn: &mut $conn,
                sql: &str,
                params: &[QueryParam],
                limit: Duration,
            ) -> DbResult<ExecuteResult> {
                let start = Instant::now();
                let result = if params.is_empty() {
                    timeout(limit, sqlx::Executor::execute(&mut *conn, sql)).await
                } else {
                    let mut query = sqlx::query::<$db>(sql);
                    for param in params {
                        query = bind_param(query, param);
                    }
                    timeout(limit, query.execute(&mut *conn)).await
                };

                match result {
                    Ok(Ok(r)) => Ok(ExecuteResult {
                        rows_affected: r.rows_affected(),
                        last_insert_id: ($last_id)(&r),
                        execution_time_ms: start.elapsed().as_millis() as u64,
                    }),
                    Ok(Err(e)) => Err(DbError::from(e)),
                    Err(_) => Err(timeout_error("write operation", limit)),
                }
            }

            pub async fn run_statements(
                conn: &mut $conn,
                statements: &[Statement],
                limit: Duration,
            ) -> DbResult<Vec<ExecuteResult>> {
                let mut results = Vec::with_capacity(statements.len());
                for (idx, stmt) in statements.iter().enumerate() {
                    match execute(&mut *conn, &stmt.sql, &stmt.params, limit).await {
                        Ok(result) => results.push(result),
                        Err(e) => {
                            debug!(statement = idx, error = %e, "Statement failed");
                            return Err(e);
                        }
                    }
                }
                Ok(results)
            }

            pub async fn transaction(
                conn: &mut $conn,
                statements: &[Statement],
                limit: Duration,
            ) -> DbResult<Vec<ExecuteResult>> {
                use sqlx::Connection as _;

                let mut tx = conn.begin().await?;
                match run_statements(&mut *tx, statements, limit).await {
                    Ok(results) => {
                        tx.commit().await?;
                        Ok(results)
                    }
                    Err(e) => {
                        if let Err(rollback_err) = tx.rollback().await {
                            warn!(error = %rollback_err, "Rollback failed");
                        }
                        Err(e)
                    }
                }
            }

            pub async fn ping(conn: &mut $conn, limit: Duration) -> DbResult<()> {
                use sqlx::Connection as _;

                match timeout(limit, conn.ping()).await {
                    Ok(result) => result.map_err(DbError::from),
                    Err(_) => Err(timeout_error("ping", limit)),
                }
            }
        }
    };
}

backend_executor!(
    mysql,
    sqlx::MySql,
    sqlx::MySqlConnection,
    |r: &sqlx::mysql::MySqlQueryResult| i64::try_from(r.last_insert_id()).ok().filter(|id| *id > 0)
);
backend_executor!(
    postgres,
    sqlx::Postgres,
    sqlx::PgConnection,
    |_: &sqlx::postgres::PgQueryResult| None
);
backend_executor!(
    sqlite,
    sqlx::Sqlite,
    sqlx::SqliteConnection,
    |r: &sqlx::sqlite::SqliteQueryResult| Some(r.last_insert_rowid()).filter(|id| *id > 0)
);
