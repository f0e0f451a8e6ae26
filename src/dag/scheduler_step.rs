// src/dag/scheduler_step.rs

//! Result type for a single scheduler transition.

use crate::dag::NodeId;
use crate::dag::state::SkippedNode;

/// Structured result of a single scheduler "step".
///
/// The runtime turns this into work: dispatch `newly_scheduled`, record
/// `newly_skipped` in the result store. Tests use it to step the graph by
/// hand and make assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Nodes moved to Running by this step, in dispatch order.
    pub newly_scheduled: Vec<NodeId>,
    /// Nodes that were marked Failed in this step.
    pub newly_failed: Vec<NodeId>,
    /// Nodes that were marked Skipped in this step.
    pub newly_skipped: Vec<SkippedNode>,
    /// Whether every node is now in a terminal state.
    pub run_finished: bool,
}
