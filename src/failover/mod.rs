//! Failover coordination across backend nodes.
//!
//! This module provides:
//! - `FailoverConfig`: ordered fallback nodes and attempt budget
//! - `NodeHealth`: per-node Healthy/Unhealthy state
//! - `FailoverCoordinator`: routes an operation to the first healthy node,
//!   marking failed nodes down and moving on
//!
//! Node state only changes through `mark_node_down` / `mark_node_up`; recovery
//! is driven by an external health checker.

pub mod coordinator;
pub mod health;

pub use coordinator::{FailoverConfig, FailoverCoordinator, FailoverStats};
pub use health::{NodeHealth, NodeState};
