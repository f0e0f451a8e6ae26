// src/dag/state.rs

//! Per-node execution state.

use std::fmt;

use crate::dag::NodeId;

/// Lifecycle state of a node within a run.
///
/// Transitions are monotonic: `Pending -> Running -> Success | Failed`, or
/// `Pending -> Skipped` when an upstream node failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// Not dispatched yet.
    Pending,
    /// Handed to a worker.
    Running,
    /// Body returned a value.
    Success,
    /// Body returned an error or panicked.
    Failed,
    /// Never invoked because an upstream node failed.
    Skipped,
}

impl NodeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeState::Success | NodeState::Failed | NodeState::Skipped
        )
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Pending => "pending",
            NodeState::Running => "running",
            NodeState::Success => "success",
            NodeState::Failed => "failed",
            NodeState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Outcome of a single body invocation, as reported back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    Success,
    Failed,
}

/// A node the scheduler skipped, and the failed node responsible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedNode {
    pub id: NodeId,
    pub blocked_by: NodeId,
}
