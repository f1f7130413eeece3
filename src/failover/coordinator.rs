//! Failover coordinator.
//!
//! The node-health table has its own lock, separate from the hook registry and
//! from the stats counters; none of them is ever held while another is taken,
//! and no lock is held while the caller's operation runs.

use crate::error::{DbError, DbResult, ErrorKind};
use crate::failover::health::NodeHealth;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_FAILOVER_ATTEMPTS: u32 = 3;

/// Failover configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FailoverConfig {
    pub enabled: bool,
    /// Node ids in preference order.
    pub fallback_nodes: Vec<String>,
    /// Period of the external health checker that calls `mark_node_up`/`mark_node_down`.
    pub health_check_interval: Duration,
    /// Pause between failover attempts.
    pub retry_interval: Duration,
    /// Total node tries per `execute` call.
    pub max_failover_attempts: u32,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fallback_nodes: Vec::new(),
            health_check_interval: DEFAULT_HEALTH_CHECK_INTERVAL,
            retry_interval: Duration::ZERO,
            max_failover_attempts: DEFAULT_MAX_FAILOVER_ATTEMPTS,
        }
    }
}

impl FailoverConfig {
    /// Enabled failover over `nodes`, in the given order.
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fallback_nodes: nodes.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_failover_attempts = attempts;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Snapshot of failover activity.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct FailoverStats {
    /// Node failures that moved traffic off a node.
    pub total_failovers: u64,
    /// `execute` calls that succeeded after at least one failover.
    pub successful_failovers: u64,
    /// `execute` calls that ran out of nodes or attempts.
    pub failed_failovers: u64,
    pub current_active_node: Option<String>,
    pub down_nodes: Vec<String>,
    pub last_failover_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Counters {
    total_failovers: u64,
    successful_failovers: u64,
    failed_failovers: u64,
    current_active_node: Option<String>,
    last_failover_time: Option<DateTime<Utc>>,
}

/// Routes operations to healthy nodes.
pub struct FailoverCoordinator {
    config: FailoverConfig,
    nodes: RwLock<Vec<NodeHealth>>,
    counters: Mutex<Counters>,
}

impl FailoverCoordinator {
    pub fn new(config: FailoverConfig) -> Self {
        let mut nodes: Vec<NodeHealth> = Vec::with_capacity(config.fallback_nodes.len());
        for id in &config.fallback_nodes {
            if !nodes.iter().any(|n| &n.id == id) {
                nodes.push(NodeHealth::new(id.clone()));
            }
        }
        Self {
            config,
            nodes: RwLock::new(nodes),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn config(&self) -> &FailoverConfig {
        &self.config
    }

    /// Run `operation` against the first healthy node, failing over to the next
    /// healthy node on node-level errors.
    ///
    /// Caller-side errors (validation, query, hook chain, cancellation) are
    /// returned as-is without touching node health.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> DbResult<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        if !self.config.enabled {
            let node = self
                .config
                .fallback_nodes
                .first()
                .cloned()
                .ok_or(DbError::NoHealthyNodes)?;
            if cancel.is_cancelled() {
                return Err(DbError::cancelled("failover", 0));
            }
            let result = operation(node.clone()).await;
            if result.is_ok() {
                self.set_active(node);
            }
            return result;
        }

        let max_attempts = self.config.max_failover_attempts.max(1);
        let mut attempts: u32 = 0;
        let mut tried: Vec<String> = Vec::new();
        let mut last_error: Option<DbError> = None;

        while attempts < max_attempts {
            if cancel.is_cancelled() {
                return Err(DbError::cancelled("failover", attempts));
            }

            // Snapshot under the read lock; the lock is released before the call
            let Some(node) = self.next_healthy_node(&tried) else {
                break;
            };

            attempts += 1;
            tried.push(node.clone());
            debug!(node = %node, attempt = attempts, "Dispatching to node");

            match operation(node.clone()).await {
                Ok(value) => {
                    self.record_success(node, attempts > 1);
                    return Ok(value);
                }
                Err(err) if !is_node_fault(&err) => return Err(err),
                Err(err) => {
                    warn!(
                        node = %node,
                        attempt = attempts,
                        max_attempts = max_attempts,
                        error = %err,
                        "Node failed, failing over"
                    );
                    self.mark_node_down(&node);
                    self.record_failover();
                    last_error = Some(err);
                }
            }

            // Pause only when another node is left to try
            if attempts < max_attempts
                && !self.config.retry_interval.is_zero()
                && self.next_healthy_node(&tried).is_some()
            {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(DbError::cancelled("failover", attempts));
                    }
                    _ = tokio::time::sleep(self.config.retry_interval) => {}
                }
            }
        }

        match last_error {
            None => {
                warn!("No healthy nodes available");
                Err(DbError::NoHealthyNodes)
            }
            Some(err) => {
                self.record_exhausted();
                warn!(attempts = attempts, error = %err, "Failover exhausted");
                Err(DbError::failover_exhausted(attempts, err))
            }
        }
    }

    /// Mark `id` unhealthy. Unknown ids are added to the table.
    pub fn mark_node_down(&self, id: &str) {
        let transitioned = {
            let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
            match nodes.iter_mut().find(|n| n.id == id) {
                Some(node) => node.mark_down(),
                None => {
                    let mut node = NodeHealth::new(id);
                    node.mark_down();
                    nodes.push(node);
                    true
                }
            }
        };
        if transitioned {
            warn!(node = %id, "Node marked down");
        }
    }

    /// Mark `id` healthy. Unknown ids are added to the table.
    pub fn mark_node_up(&self, id: &str) {
        let transitioned = {
            let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
            match nodes.iter_mut().find(|n| n.id == id) {
                Some(node) => node.mark_up(),
                None => {
                    let mut node = NodeHealth::new(id);
                    node.mark_up();
                    nodes.push(node);
                    false
                }
            }
        };
        if transitioned {
            info!(node = %id, "Node marked up");
        }
    }

    pub fn get_healthy_nodes(&self) -> Vec<String> {
        self.nodes_where(true)
    }

    pub fn get_unhealthy_nodes(&self) -> Vec<String> {
        self.nodes_where(false)
    }

    /// Health record for one node.
    pub fn node_health(&self, id: &str) -> Option<NodeHealth> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        nodes.iter().find(|n| n.id == id).cloned()
    }

    /// Node of the most recent successful call.
    pub fn active_node(&self) -> Option<String> {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current_active_node
            .clone()
    }

    pub fn get_stats(&self) -> FailoverStats {
        let down_nodes = self.get_unhealthy_nodes();
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        FailoverStats {
            total_failovers: counters.total_failovers,
            successful_failovers: counters.successful_failovers,
            failed_failovers: counters.failed_failovers,
            current_active_node: counters.current_active_node.clone(),
            down_nodes,
            last_failover_time: counters.last_failover_time,
        }
    }

    /// Clear counters. Node health is left untouched.
    pub fn reset_stats(&self) {
        *self.counters.lock().unwrap_or_else(PoisonError::into_inner) = Counters::default();
    }

    fn next_healthy_node(&self, tried: &[String]) -> Option<String> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        self.config
            .fallback_nodes
            .iter()
            .filter(|id| !tried.contains(id))
            .find(|id| nodes.iter().any(|n| &n.id == *id && n.is_healthy()))
            .cloned()
    }

    fn nodes_where(&self, healthy: bool) -> Vec<String> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        nodes
            .iter()
            .filter(|n| n.is_healthy() == healthy)
            .map(|n| n.id.clone())
            .collect()
    }

    fn set_active(&self, node: String) {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current_active_node = Some(node);
    }

    fn record_success(&self, node: String, after_failover: bool) {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        if after_failover {
            counters.successful_failovers += 1;
            info!(node = %node, "Failover succeeded");
        }
        counters.current_active_node = Some(node);
    }

    fn record_failover(&self) {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters.total_failovers += 1;
        counters.last_failover_time = Some(Utc::now());
    }

    fn record_exhausted(&self) {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters.failed_failovers += 1;
    }
}

impl std::fmt::Debug for FailoverCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverCoordinator")
            .field("enabled", &self.config.enabled)
            .field("fallback_nodes", &self.config.fallback_nodes)
            .field("down_nodes", &self.get_unhealthy_nodes())
            .finish()
    }
}

/// Whether `err` reflects on the node rather than on the caller's request.
fn is_node_fault(err: &DbError) -> bool {
    !matches!(
        err.kind(),
        ErrorKind::Validation | ErrorKind::Query | ErrorKind::HookChain | ErrorKind::Cancelled
    )
}
