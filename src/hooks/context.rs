//! Per-operation execution record passed through the hook pipeline.

use crate::error::{DbError, ErrorKind};
use crate::models::QueryParam;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Kind of operation a context describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Acquire,
    Release,
    Query,
    Exec,
    Transaction,
    Batch,
    Ping,
    HealthCheck,
    Other(String),
}

impl Operation {
    pub fn as_str(&self) -> &str {
        match self {
            Operation::Connect => "connect",
            Operation::Acquire => "acquire",
            Operation::Release => "release",
            Operation::Query => "query",
            Operation::Exec => "exec",
            Operation::Transaction => "transaction",
            Operation::Batch => "batch",
            Operation::Ping => "ping",
            Operation::HealthCheck => "healthcheck",
            Operation::Other(tag) => tag,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error recorded on a context for hooks to inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&DbError> for ContextError {
    fn from(err: &DbError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Data hooks pass forward within one dispatch.
///
/// Well-known keys are typed fields; `extensions` holds anything else.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Zero on the first attempt.
    pub retry_count: u32,
    pub cache_hit: Option<bool>,
    pub tenant_id: Option<String>,
    extensions: HashMap<String, JsonValue>,
}

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.extensions.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) -> Option<JsonValue> {
        self.extensions.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        self.extensions.remove(key)
    }

    /// Append `value` to the array stored at `key`, creating it if needed.
    pub fn append(&mut self, key: impl Into<String>, value: JsonValue) {
        let slot = self
            .extensions
            .entry(key.into())
            .or_insert_with(|| JsonValue::Array(Vec::new()));
        match slot {
            JsonValue::Array(items) => items.push(value),
            other => {
                let previous = other.take();
                *other = JsonValue::Array(vec![previous, value]);
            }
        }
    }

    pub fn extensions(&self) -> &HashMap<String, JsonValue> {
        &self.extensions
    }

    pub(crate) fn merge(&mut self, data: serde_json::Map<String, JsonValue>) {
        self.extensions.extend(data);
    }
}

/// Mutable record describing one in-flight operation. Never shared across operations.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub operation_id: Uuid,
    pub operation: Operation,
    pub query: String,
    pub args: Vec<QueryParam>,
    /// Node (connection id) the operation runs against, once selected.
    pub node: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration: Option<Duration>,
    pub error: Option<ContextError>,
    pub rows_affected: Option<u64>,
    pub metadata: Metadata,
    started: Instant,
}

impl ExecutionContext {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation_id: Uuid::new_v4(),
            operation,
            query: String::new(),
            args: Vec::new(),
            node: None,
            started_at: Utc::now(),
            duration: None,
            error: None,
            rows_affected: None,
            metadata: Metadata::default(),
            started: Instant::now(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_args(mut self, args: Vec<QueryParam>) -> Self {
        self.args = args;
        self
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// Time since the context was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stamp `duration` with the elapsed time.
    pub fn finish(&mut self) {
        self.duration = Some(self.started.elapsed());
    }

    pub fn record_error(&mut self, err: &DbError) {
        self.error = Some(ContextError::from(err));
    }
}
