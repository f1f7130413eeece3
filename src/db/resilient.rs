//! Pool façade that routes every operation through the hook pipeline, the
//! retry engine and the failover coordinator.
//!
//! Layering for one logical call:
//!
//! ```text
//! Retryer::execute_if            (optional, transient errors only)
//!   FailoverCoordinator::execute (optional, picks the node)
//!     acquire                    BeforeAcquire / AfterAcquire
//!       raw call                 Before* / After* / OnError
//!     release                    BeforeRelease / AfterRelease
//! ```
//!
//! Without a coordinator every call goes to the primary node. The hook
//! registry, retryer and coordinator are injected, so several pools can share
//! or isolate them as needed.

use crate::config::ResilienceConfig;
use crate::db::executor::QueryExecutor;
use crate::db::pool::{ConnectionManager, DbConnection, PoolStats};
use crate::error::{DbError, DbResult};
use crate::failover::{FailoverCoordinator, FailoverStats};
use crate::hooks::{ExecutionContext, HookRegistry, HookType, Operation};
use crate::models::{
    BatchResult, ConnectionConfig, ConnectionInfo, DatabaseType, ExecuteResult, QueryParam,
    QueryResult, Statement,
};
use crate::retry::{RetryStats, Retryer};
use futures_util::future::BoxFuture;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One raw database call.
#[derive(Debug, Clone, Copy)]
enum Call<'a> {
    Query {
        sql: &'a str,
        params: &'a [QueryParam],
    },
    Exec {
        sql: &'a str,
        params: &'a [QueryParam],
    },
    Batch(&'a [Statement]),
    Transaction(&'a [Statement]),
    Ping,
}

impl Call<'_> {
    fn operation(&self) -> Operation {
        match self {
            Call::Query { .. } => Operation::Query,
            Call::Exec { .. } => Operation::Exec,
            Call::Batch(_) => Operation::Batch,
            Call::Transaction(_) => Operation::Transaction,
            Call::Ping => Operation::Ping,
        }
    }

    fn hook_types(&self) -> (HookType, HookType) {
        match self {
            Call::Query { .. } | Call::Ping => (HookType::BeforeQuery, HookType::AfterQuery),
            Call::Exec { .. } => (HookType::BeforeExec, HookType::AfterExec),
            Call::Batch(_) => (HookType::BeforeBatch, HookType::AfterBatch),
            Call::Transaction(_) => (HookType::BeforeTransaction, HookType::AfterTransaction),
        }
    }

    /// Calls that only make sense on a writable node.
    fn writes(&self) -> bool {
        matches!(self, Call::Exec { .. } | Call::Batch(_) | Call::Transaction(_))
    }

    /// Reject malformed input before anything is retried.
    fn validate(&self) -> DbResult<()> {
        match self {
            Call::Query { sql, .. } | Call::Exec { sql, .. } if sql.trim().is_empty() => {
                Err(DbError::invalid_input("SQL statement cannot be empty"))
            }
            Call::Batch(statements) | Call::Transaction(statements) => {
                if statements.is_empty() {
                    return Err(DbError::invalid_input(
                        "at least one statement is required",
                    ));
                }
                match statements.iter().position(|s| s.sql.trim().is_empty()) {
                    Some(idx) => Err(DbError::invalid_input(format!(
                        "statement {idx} cannot be empty"
                    ))),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    fn context(&self) -> ExecutionContext {
        let ctx = ExecutionContext::new(self.operation());
        match self {
            Call::Query { sql, params } | Call::Exec { sql, params } => {
                ctx.with_query(*sql).with_args(params.to_vec())
            }
            Call::Batch(statements) | Call::Transaction(statements) => {
                let sql: Vec<&str> = statements.iter().map(|s| s.sql.as_str()).collect();
                let args = statements.iter().flat_map(|s| s.params.iter().cloned());
                ctx.with_query(sql.join(";\n")).with_args(args.collect())
            }
            Call::Ping => ctx,
        }
    }
}

#[derive(Debug)]
enum Outcome {
    Rows(QueryResult),
    Written(ExecuteResult),
    Statements(BatchResult),
    Pong,
}

impl Outcome {
    fn rows_affected(&self) -> Option<u64> {
        match self {
            Outcome::Written(r) => Some(r.rows_affected),
            Outcome::Statements(r) => Some(r.total_rows_affected()),
            Outcome::Rows(_) | Outcome::Pong => None,
        }
    }

    fn into_rows(self) -> DbResult<QueryResult> {
        match self {
            Outcome::Rows(r) => Ok(r),
            other => Err(mismatch("rows", &other)),
        }
    }

    fn into_written(self) -> DbResult<ExecuteResult> {
        match self {
            Outcome::Written(r) => Ok(r),
            other => Err(mismatch("execute result", &other)),
        }
    }

    fn into_statements(self) -> DbResult<BatchResult> {
        match self {
            Outcome::Statements(r) => Ok(r),
            other => Err(mismatch("batch result", &other)),
        }
    }

    fn into_pong(self) -> DbResult<()> {
        match self {
            Outcome::Pong => Ok(()),
            other => Err(mismatch("ping", &other)),
        }
    }
}

fn mismatch(expected: &str, got: &Outcome) -> DbError {
    DbError::internal(format!("expected {expected}, got {got:?}"))
}

/// Fire OnError for a failed context. Failures of the OnError chain itself
/// are logged and never replace the original error.
fn report_error(hooks: &HookRegistry, ctx: &mut ExecutionContext, err: &DbError) {
    ctx.record_error(err);
    if ctx.duration.is_none() {
        ctx.finish();
    }
    if let Err(hook_err) = hooks.execute_hooks(HookType::OnError, ctx) {
        warn!(
            operation = %ctx.operation,
            operation_id = %ctx.operation_id,
            error = %hook_err,
            "OnError hook chain failed"
        );
    }
}

/// A connection checked out through [`ResilientPool::acquire`].
///
/// Release hooks fire exactly once, from [`release`](Self::release) or from
/// `Drop`, whichever comes first.
pub struct PooledConnection {
    conn: Option<DbConnection>,
    db_type: DatabaseType,
    node: String,
    writable: bool,
    hooks: Arc<HookRegistry>,
    executor: QueryExecutor,
    acquired_at: Instant,
}

impl PooledConnection {
    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    /// Time since the connection was checked out.
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    pub async fn query(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<QueryResult> {
        let call = Call::Query { sql, params };
        call.validate()?;
        self.run(call, call.context()).await?.into_rows()
    }

    pub async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<ExecuteResult> {
        let call = Call::Exec { sql, params };
        call.validate()?;
        self.run(call, call.context()).await?.into_written()
    }

    pub async fn batch(&mut self, statements: &[Statement]) -> DbResult<BatchResult> {
        let call = Call::Batch(statements);
        call.validate()?;
        self.run(call, call.context()).await?.into_statements()
    }

    pub async fn transaction(&mut self, statements: &[Statement]) -> DbResult<BatchResult> {
        let call = Call::Transaction(statements);
        call.validate()?;
        self.run(call, call.context()).await?.into_statements()
    }

    pub async fn ping(&mut self) -> DbResult<()> {
        self.run(Call::Ping, Call::Ping.context()).await?.into_pong()
    }

    /// Return the connection to its pool, firing the release hooks.
    pub fn release(mut self) -> DbResult<()> {
        self.release_inner()
    }

    async fn run(&mut self, call: Call<'_>, mut ctx: ExecutionContext) -> DbResult<Outcome> {
        let (before, after) = call.hook_types();
        ctx.node = Some(self.node.clone());

        if call.writes() && !self.writable {
            let err = DbError::invalid_input(format!("node '{}' is read-only", self.node));
            report_error(&self.hooks, &mut ctx, &err);
            return Err(err);
        }

        if let Err(err) = self.hooks.execute_hooks(before, &mut ctx) {
            report_error(&self.hooks, &mut ctx, &err);
            return Err(err);
        }

        let executor = self.executor;
        let Some(conn) = self.conn.as_mut() else {
            let err = DbError::internal("connection already released");
            report_error(&self.hooks, &mut ctx, &err);
            return Err(err);
        };

        let result = match call {
            Call::Query { sql, params } => executor.fetch(conn, sql, params).await.map(Outcome::Rows),
            Call::Exec { sql, params } => {
                executor.execute(conn, sql, params).await.map(Outcome::Written)
            }
            Call::Batch(statements) => {
                executor.batch(conn, statements).await.map(Outcome::Statements)
            }
            Call::Transaction(statements) => executor
                .transaction(conn, statements)
                .await
                .map(Outcome::Statements),
            Call::Ping => executor.ping(conn).await.map(|()| Outcome::Pong),
        };
        ctx.finish();

        match result {
            Ok(outcome) => {
                ctx.rows_affected = outcome.rows_affected();
                if let Err(err) = self.hooks.execute_hooks(after, &mut ctx) {
                    report_error(&self.hooks, &mut ctx, &err);
                    return Err(err);
                }
                Ok(outcome)
            }
            Err(err) => {
                report_error(&self.hooks, &mut ctx, &err);
                Err(err)
            }
        }
    }

    fn release_inner(&mut self) -> DbResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        let mut ctx = ExecutionContext::new(Operation::Release).with_node(self.node.clone());
        let before = self.hooks.execute_hooks(HookType::BeforeRelease, &mut ctx);
        drop(conn);
        ctx.finish();
        let after = self.hooks.execute_hooks(HookType::AfterRelease, &mut ctx);

        debug!(
            node = %self.node,
            held_ms = self.acquired_at.elapsed().as_millis() as u64,
            "Connection released"
        );
        before.and(after)
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Err(err) = self.release_inner() {
            warn!(node = %self.node, error = %err, "Release hook failed during drop");
        }
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("node", &self.node)
            .field("db_type", &self.db_type)
            .field("writable", &self.writable)
            .field("released", &self.conn.is_none())
            .finish_non_exhaustive()
    }
}

/// Hooked, retried and failover-aware access to a set of node pools.
#[derive(Debug)]
pub struct ResilientPool {
    manager: ConnectionManager,
    hooks: Arc<HookRegistry>,
    retryer: Option<Arc<Retryer>>,
    failover: Option<Arc<FailoverCoordinator>>,
    primary: String,
    executor: QueryExecutor,
}

impl ResilientPool {
    /// Pool without retry or failover; calls go to `primary`.
    pub fn new(
        manager: ConnectionManager,
        hooks: Arc<HookRegistry>,
        primary: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            hooks,
            retryer: None,
            failover: None,
            primary: primary.into(),
            executor: QueryExecutor::new(),
        }
    }

    /// Build retry and (when enabled) failover from `config`.
    pub fn from_config(
        manager: ConnectionManager,
        hooks: Arc<HookRegistry>,
        primary: impl Into<String>,
        config: &ResilienceConfig,
    ) -> DbResult<Self> {
        let mut pool = Self::new(manager, hooks, primary)
            .with_retryer(Arc::new(Retryer::new(config.retry_policy()?)));
        if config.failover_enabled {
            pool = pool.with_failover(Arc::new(FailoverCoordinator::new(
                config.failover_config(),
            )));
        }
        Ok(pool)
    }

    pub fn with_retryer(mut self, retryer: Arc<Retryer>) -> Self {
        self.retryer = Some(retryer);
        self
    }

    pub fn with_failover(mut self, coordinator: Arc<FailoverCoordinator>) -> Self {
        self.failover = Some(coordinator);
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.executor = QueryExecutor::with_timeout(timeout);
        self
    }

    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn retryer(&self) -> Option<&Arc<Retryer>> {
        self.retryer.as_ref()
    }

    pub fn failover(&self) -> Option<&Arc<FailoverCoordinator>> {
        self.failover.as_ref()
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Open a node pool, firing BeforeConnection/AfterConnection.
    pub async fn connect(&self, config: ConnectionConfig) -> DbResult<ConnectionInfo> {
        let mut ctx = ExecutionContext::new(Operation::Connect).with_node(config.id.clone());
        if let Err(err) = self.hooks.execute_hooks(HookType::BeforeConnection, &mut ctx) {
            report_error(&self.hooks, &mut ctx, &err);
            return Err(err);
        }

        let info = match self.manager.connect(config).await {
            Ok(info) => info,
            Err(err) => {
                report_error(&self.hooks, &mut ctx, &err);
                return Err(err);
            }
        };

        ctx.finish();
        if let Err(err) = self.hooks.execute_hooks(HookType::AfterConnection, &mut ctx) {
            report_error(&self.hooks, &mut ctx, &err);
            return Err(err);
        }
        Ok(info)
    }

    pub async fn disconnect(&self, node: &str) -> DbResult<()> {
        self.manager.disconnect(node).await
    }

    pub async fn close(&self) {
        self.manager.close_all().await;
    }

    /// Check out a connection from `node`, firing BeforeAcquire/AfterAcquire.
    pub async fn acquire(&self, node: &str) -> DbResult<PooledConnection> {
        let mut ctx = ExecutionContext::new(Operation::Acquire).with_node(node);
        if let Err(err) = self.hooks.execute_hooks(HookType::BeforeAcquire, &mut ctx) {
            report_error(&self.hooks, &mut ctx, &err);
            return Err(err);
        }

        let checkout = async {
            let writable = self.manager.is_writable(node).await?;
            Ok::<_, DbError>((self.manager.acquire(node).await?, writable))
        };
        let (conn, writable) = match checkout.await {
            Ok(checked_out) => checked_out,
            Err(err) => {
                report_error(&self.hooks, &mut ctx, &err);
                return Err(err);
            }
        };

        // From here on, dropping `pooled` releases the connection
        let pooled = PooledConnection {
            db_type: conn.db_type(),
            conn: Some(conn),
            node: node.to_string(),
            writable,
            hooks: Arc::clone(&self.hooks),
            executor: self.executor,
            acquired_at: Instant::now(),
        };

        ctx.finish();
        if let Err(err) = self.hooks.execute_hooks(HookType::AfterAcquire, &mut ctx) {
            report_error(&self.hooks, &mut ctx, &err);
            return Err(err);
        }
        Ok(pooled)
    }

    /// Run `f` with a connection from `node`, releasing it on every exit path.
    ///
    /// Cancelling `cancel` while `f` runs drops its future and returns
    /// [`DbError::Cancelled`].
    pub async fn acquire_func<T, F>(
        &self,
        cancel: &CancellationToken,
        node: &str,
        f: F,
    ) -> DbResult<T>
    where
        F: for<'c> FnOnce(&'c mut PooledConnection) -> BoxFuture<'c, DbResult<T>>,
    {
        if cancel.is_cancelled() {
            return Err(DbError::cancelled("acquire", 0));
        }
        let mut conn = self.acquire(node).await?;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DbError::cancelled("acquire", 1)),
            result = f(&mut conn) => result,
        };

        let released = conn.release();
        match (result, released) {
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err),
            (Ok(value), Ok(())) => Ok(value),
        }
    }

    pub async fn query(
        &self,
        cancel: &CancellationToken,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<QueryResult> {
        self.run(cancel, Call::Query { sql, params })
            .await?
            .into_rows()
    }

    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<ExecuteResult> {
        self.run(cancel, Call::Exec { sql, params })
            .await?
            .into_written()
    }

    /// Run `statements` in order on one connection, stopping at the first failure.
    pub async fn batch(
        &self,
        cancel: &CancellationToken,
        statements: &[Statement],
    ) -> DbResult<BatchResult> {
        self.run(cancel, Call::Batch(statements))
            .await?
            .into_statements()
    }

    /// Run `statements` atomically; nothing is committed if any of them fails.
    pub async fn transaction(
        &self,
        cancel: &CancellationToken,
        statements: &[Statement],
    ) -> DbResult<BatchResult> {
        self.run(cancel, Call::Transaction(statements))
            .await?
            .into_statements()
    }

    pub async fn ping(&self, cancel: &CancellationToken) -> DbResult<()> {
        self.run(cancel, Call::Ping).await?.into_pong()
    }

    /// Ping `node` once and record the outcome on the failover coordinator.
    ///
    /// Meant to be driven by an external checker every
    /// `FailoverConfig::health_check_interval`.
    pub async fn health_check(&self, node: &str) -> DbResult<()> {
        let result = async {
            let mut conn = self.acquire(node).await?;
            let ctx = ExecutionContext::new(Operation::HealthCheck);
            conn.run(Call::Ping, ctx).await?;
            conn.release()
        }
        .await;

        if let Some(coordinator) = &self.failover {
            match &result {
                Ok(()) => coordinator.mark_node_up(node),
                Err(err) => {
                    debug!(node = %node, error = %err, "Health check failed");
                    coordinator.mark_node_down(node);
                }
            }
        }
        result
    }

    pub async fn stats(&self, node: &str) -> DbResult<PoolStats> {
        self.manager.pool_stats(node).await
    }

    pub fn retry_stats(&self) -> Option<RetryStats> {
        self.retryer.as_ref().map(|r| r.stats())
    }

    pub fn failover_stats(&self) -> Option<FailoverStats> {
        self.failover.as_ref().map(|f| f.get_stats())
    }

    async fn run(&self, cancel: &CancellationToken, call: Call<'_>) -> DbResult<Outcome> {
        call.validate()?;
        let call = &call;

        let Some(retryer) = &self.retryer else {
            if cancel.is_cancelled() {
                return Err(DbError::cancelled(call.operation().as_str(), 0));
            }
            return self.route(cancel, call, 0).await;
        };

        let rounds = AtomicU32::new(0);
        // Later rounds may find every node down; the node error that put them
        // there stays the reported cause
        let last_exhausted: Mutex<Option<DbError>> = Mutex::new(None);
        let (rounds, last_exhausted) = (&rounds, &last_exhausted);

        let result = retryer
            .execute_if(
                cancel,
                move || async move {
                    let retry_count = rounds.fetch_add(1, Ordering::Relaxed);
                    match self.route(cancel, call, retry_count).await {
                        Err(err @ DbError::FailoverExhausted { .. }) if err.is_retryable() => {
                            debug!(round = retry_count, error = %err, "Failover round exhausted");
                            *last_exhausted.lock().unwrap_or_else(PoisonError::into_inner) =
                                Some(err);
                            Err(DbError::NoHealthyNodes)
                        }
                        other => other,
                    }
                },
                DbError::is_retryable,
            )
            .await;

        match result {
            Err(DbError::RetryExhausted { attempts, source })
                if matches!(*source, DbError::NoHealthyNodes) =>
            {
                let cause = last_exhausted
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                Err(DbError::retry_exhausted(attempts, cause.unwrap_or(*source)))
            }
            other => other,
        }
    }

    async fn route(
        &self,
        cancel: &CancellationToken,
        call: &Call<'_>,
        retry_count: u32,
    ) -> DbResult<Outcome> {
        match &self.failover {
            Some(coordinator) => {
                coordinator
                    .execute(cancel, move |node| self.attempt(node, call, retry_count))
                    .await
            }
            None => self.attempt(self.primary.clone(), call, retry_count).await,
        }
    }

    /// One raw attempt on one node, with its own context.
    async fn attempt(&self, node: String, call: &Call<'_>, retry_count: u32) -> DbResult<Outcome> {
        let mut conn = self.acquire(&node).await?;
        let mut ctx = call.context();
        ctx.metadata.retry_count = retry_count;
        let outcome = conn.run(*call, ctx).await?;
        conn.release()?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;

    #[test]
    fn test_call_validation() {
        let empty = Call::Query {
            sql: "   ",
            params: &[],
        };
        assert!(matches!(empty.validate(), Err(DbError::InvalidInput { .. })));

        let ok = Call::Exec {
            sql: "DELETE FROM t",
            params: &[],
        };
        assert!(ok.validate().is_ok());

        assert!(Call::Batch(&[]).validate().is_err());
        let statements = [Statement::new("INSERT INTO t VALUES (1)"), Statement::new("")];
        let err = Call::Transaction(&statements).validate().unwrap_err();
        assert!(err.to_string().contains("statement 1"));

        assert!(Call::Ping.validate().is_ok());
    }

    #[test]
    fn test_call_writes() {
        assert!(!Call::Query { sql: "SELECT 1", params: &[] }.writes());
        assert!(!Call::Ping.writes());
        assert!(Call::Exec { sql: "DELETE FROM t", params: &[] }.writes());
        assert!(Call::Batch(&[]).writes());
        assert!(Call::Transaction(&[]).writes());
    }

    #[test]
    fn test_call_hook_types() {
        let query = Call::Query {
            sql: "SELECT 1",
            params: &[],
        };
        assert_eq!(
            query.hook_types(),
            (HookType::BeforeQuery, HookType::AfterQuery)
        );
        assert_eq!(
            Call::Batch(&[]).hook_types(),
            (HookType::BeforeBatch, HookType::AfterBatch)
        );
        assert_eq!(
            Call::Transaction(&[]).hook_types(),
            (HookType::BeforeTransaction, HookType::AfterTransaction)
        );
        assert_eq!(Call::Ping.operation(), Operation::Ping);
    }

    #[test]
    fn test_call_context() {
        let params = [QueryParam::Int(7)];
        let ctx = Call::Exec {
            sql: "UPDATE t SET v = ?",
            params: &params,
        }
        .context();
        assert_eq!(ctx.operation, Operation::Exec);
        assert_eq!(ctx.query, "UPDATE t SET v = ?");
        assert_eq!(ctx.args, vec![QueryParam::Int(7)]);

        let statements = [
            Statement::new("INSERT INTO t VALUES (?)").bind(1i64),
            Statement::new("INSERT INTO t VALUES (?)").bind(2i64),
        ];
        let ctx = Call::Batch(&statements).context();
        assert_eq!(ctx.query.matches("INSERT").count(), 2);
        assert_eq!(ctx.args.len(), 2);
    }

    #[test]
    fn test_outcome_rows_affected() {
        let written = Outcome::Written(ExecuteResult {
            rows_affected: 3,
            ..Default::default()
        });
        assert_eq!(written.rows_affected(), Some(3));
        assert_eq!(Outcome::Pong.rows_affected(), None);
        assert!(Outcome::Pong.into_rows().is_err());
    }

    #[tokio::test]
    async fn test_unknown_primary_and_empty_sql_not_retried() {
        let retryer = Arc::new(Retryer::new(RetryPolicy::linear(
            3,
            Duration::from_millis(1),
        )));
        let pool = ResilientPool::new(
            ConnectionManager::new(),
            Arc::new(HookRegistry::new()),
            "missing",
        )
        .with_retryer(Arc::clone(&retryer));
        let cancel = CancellationToken::new();

        let err = pool.query(&cancel, "", &[]).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
        assert_eq!(retryer.stats().total_attempts, 0);

        // An unknown node id fails on the first attempt
        let err = pool.query(&cancel, "SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, DbError::ConnectionNotFound { .. }));
        assert_eq!(retryer.stats().total_attempts, 1);
    }
}
