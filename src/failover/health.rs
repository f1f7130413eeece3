//! Node health records.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Healthy,
    Unhealthy,
}

/// Health of one backend node.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NodeHealth {
    pub id: String,
    pub state: NodeState,
    pub last_checked: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

impl NodeHealth {
    /// New nodes start healthy.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: NodeState::Healthy,
            last_checked: None,
            consecutive_failures: 0,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.state == NodeState::Healthy
    }

    /// Returns true if the node transitioned Healthy → Unhealthy.
    pub(crate) fn mark_down(&mut self) -> bool {
        let transitioned = self.is_healthy();
        self.state = NodeState::Unhealthy;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_checked = Some(Utc::now());
        transitioned
    }

    /// Returns true if the node transitioned Unhealthy → Healthy.
    pub(crate) fn mark_up(&mut self) -> bool {
        let transitioned = !self.is_healthy();
        self.state = NodeState::Healthy;
        self.consecutive_failures = 0;
        self.last_checked = Some(Utc::now());
        transitioned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_healthy() {
        let node = NodeHealth::new("primary");
        assert!(node.is_healthy());
        assert_eq!(node.consecutive_failures, 0);
        assert!(node.last_checked.is_none());
    }

    #[test]
    fn test_transitions() {
        let mut node = NodeHealth::new("replica-1");
        assert!(node.mark_down());
        assert!(!node.mark_down());
        assert_eq!(node.consecutive_failures, 2);
        assert!(!node.is_healthy());

        assert!(node.mark_up());
        assert!(!node.mark_up());
        assert_eq!(node.consecutive_failures, 0);
        assert!(node.last_checked.is_some());
    }
}
