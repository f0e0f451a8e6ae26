// src/dag/state_manager.rs

//! Node state transitions used by the scheduler.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::dag::state::{NodeState, SkippedNode};
use crate::dag::{DependencyGraph, NodeId};

/// Applies state transitions to the per-node state map.
pub struct StateManager<'a> {
    graph: &'a DependencyGraph,
    states: &'a mut BTreeMap<NodeId, NodeState>,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a DependencyGraph, states: &'a mut BTreeMap<NodeId, NodeState>) -> Self {
        Self { graph, states }
    }

    /// Mark every `Pending` transitive dependent of a failed node as
    /// `Skipped`.
    ///
    /// Returns the newly skipped nodes (excluding the failed node itself).
    pub fn mark_dependents_skipped(&mut self, failed: &str) -> Vec<SkippedNode> {
        let mut stack: Vec<&str> = self.graph.dependents_of(failed).collect();
        let mut newly_skipped = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(state) = self.states.get_mut(name) {
                if *state == NodeState::Pending {
                    *state = NodeState::Skipped;
                    debug!(
                        node = %name,
                        blocked_by = %failed,
                        "marking dependent as Skipped due to upstream failure"
                    );
                    newly_skipped.push(SkippedNode {
                        id: name.to_string(),
                        blocked_by: failed.to_string(),
                    });
                    stack.extend(self.graph.dependents_of(name));
                }
            }
        }

        newly_skipped.sort_by(|a, b| a.id.cmp(&b.id));
        newly_skipped
    }

    /// Mark every node that has not been dispatched yet as `Skipped`.
    pub fn mark_all_pending_skipped(&mut self, failed: &str) -> Vec<SkippedNode> {
        let mut newly_skipped = Vec::new();

        for (id, state) in self.states.iter_mut() {
            if *state == NodeState::Pending {
                *state = NodeState::Skipped;
                newly_skipped.push(SkippedNode {
                    id: id.clone(),
                    blocked_by: failed.to_string(),
                });
            }
        }

        newly_skipped
    }

    /// Collect up to `budget` ready nodes, mark them `Running`, and return
    /// their ids in dispatch order.
    pub fn collect_new_ready(&mut self, budget: usize) -> Vec<NodeId> {
        if budget == 0 {
            return Vec::new();
        }

        // Decide first, then mutate to avoid borrowing issues.
        let candidates: Vec<NodeId> = self
            .graph
            .ready_set(self.states)
            .into_iter()
            .take(budget)
            .map(str::to_string)
            .collect();

        for id in candidates.iter() {
            info!(node = %id, "dependencies satisfied; dispatching");
            self.states.insert(id.clone(), NodeState::Running);
        }

        candidates
    }
}
