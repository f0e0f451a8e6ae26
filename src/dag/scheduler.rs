use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state::{NodeOutcome, NodeState};
use crate::dag::state_manager::StateManager;
use crate::dag::{DependencyGraph, NodeId};
use crate::types::FailurePolicy;

/// Scheduler holds the immutable graph plus mutable per-node state.
///
/// It is a pure, synchronous state machine: no channels, no threads. The
/// runtime feeds it completions and acts on the [`SchedulerStep`]s it
/// returns. It is responsible for:
/// - deciding which nodes are ready (all hard dependencies succeeded)
/// - keeping the number of running nodes within `max_concurrency`
/// - marking nodes as succeeded/failed
/// - skipping dependents (or everything pending, under
///   [`FailurePolicy::Abort`]) when a node fails
#[derive(Debug)]
pub struct Scheduler {
    graph: Arc<DependencyGraph>,
    states: BTreeMap<NodeId, NodeState>,
    max_concurrency: usize,
    policy: FailurePolicy,
    aborted: bool,
}

impl Scheduler {
    /// Every node starts `Pending`. A `max_concurrency` of zero is treated
    /// as one.
    pub fn new(graph: Arc<DependencyGraph>, max_concurrency: usize, policy: FailurePolicy) -> Self {
        let states = graph
            .node_ids()
            .map(|id| (id.to_string(), NodeState::Pending))
            .collect();

        Self {
            graph,
            states,
            max_concurrency: max_concurrency.max(1),
            policy,
            aborted: false,
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn state_of(&self, id: &str) -> Option<NodeState> {
        self.states.get(id).copied()
    }

    pub fn states(&self) -> &BTreeMap<NodeId, NodeState> {
        &self.states
    }

    pub fn running_count(&self) -> usize {
        self.states
            .values()
            .filter(|s| **s == NodeState::Running)
            .count()
    }

    /// Ids currently in the given state, ascending.
    pub fn nodes_in(&self, state: NodeState) -> Vec<NodeId> {
        self.states
            .iter()
            .filter(|(_, s)| **s == state)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Returns `true` once every node is `Success`, `Failed` or `Skipped`.
    pub fn is_finished(&self) -> bool {
        self.states.values().all(|s| s.is_terminal())
    }

    /// Whether a failure stopped further dispatching.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Dispatch the initial ready set.
    pub fn start(&mut self) -> SchedulerStep {
        debug!(
            nodes = self.states.len(),
            max_concurrency = self.max_concurrency,
            "scheduler: starting run"
        );

        let newly_scheduled = self.collect_ready();
        SchedulerStep {
            newly_scheduled,
            run_finished: self.is_finished(),
            ..SchedulerStep::default()
        }
    }

    /// Record the outcome of a running node and dispatch whatever became
    /// ready as a result.
    ///
    /// Completions for unknown nodes, or nodes that are not `Running`, are
    /// ignored.
    pub fn handle_completion(&mut self, id: &str, outcome: NodeOutcome) -> SchedulerStep {
        match self.states.get(id) {
            Some(NodeState::Running) => {}
            Some(state) => {
                warn!(node = %id, %state, "completion for node that is not running; ignoring");
                return SchedulerStep {
                    run_finished: self.is_finished(),
                    ..SchedulerStep::default()
                };
            }
            None => {
                warn!(node = %id, "completion for unknown node; ignoring");
                return SchedulerStep {
                    run_finished: self.is_finished(),
                    ..SchedulerStep::default()
                };
            }
        }

        let mut step = SchedulerStep::default();

        match outcome {
            NodeOutcome::Success => {
                self.states.insert(id.to_string(), NodeState::Success);
                debug!(node = %id, "node completed successfully");
            }
            NodeOutcome::Failed => {
                self.states.insert(id.to_string(), NodeState::Failed);
                step.newly_failed.push(id.to_string());

                let mut manager = StateManager::new(&self.graph, &mut self.states);
                step.newly_skipped = match self.policy {
                    FailurePolicy::Continue => {
                        warn!(node = %id, "node failed; skipping its dependents");
                        manager.mark_dependents_skipped(id)
                    }
                    FailurePolicy::Abort => {
                        warn!(node = %id, "node failed; aborting remaining nodes");
                        self.aborted = true;
                        manager.mark_all_pending_skipped(id)
                    }
                };
            }
        }

        step.newly_scheduled = self.collect_ready();
        step.run_finished = self.is_finished();

        if step.run_finished {
            info!(
                succeeded = self.nodes_in(NodeState::Success).len(),
                failed = self.nodes_in(NodeState::Failed).len(),
                skipped = self.nodes_in(NodeState::Skipped).len(),
                "scheduler: all nodes terminal"
            );
        }

        step
    }

    fn collect_ready(&mut self) -> Vec<NodeId> {
        if self.aborted {
            return Vec::new();
        }

        let budget = self.max_concurrency.saturating_sub(self.running_count());
        let mut manager = StateManager::new(&self.graph, &mut self.states);
        manager.collect_new_ready(budget)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::dag::state::SkippedNode;

    fn graph(decls: &[(&str, &[&str])]) -> Arc<DependencyGraph> {
        let decls = decls.iter().map(|(id, deps)| {
            (
                id.to_string(),
                deps.iter().map(|d| d.to_string()).collect::<BTreeSet<_>>(),
            )
        });
        Arc::new(DependencyGraph::from_declarations(decls).unwrap())
    }

    fn ensemble() -> Arc<DependencyGraph> {
        graph(&[
            ("pre_process", &[]),
            ("model1", &["pre_process"]),
            ("model2", &["pre_process"]),
            ("ensemble", &["model1", "model2"]),
        ])
    }

    #[test]
    fn dependents_are_scheduled_only_after_success() {
        let mut scheduler = Scheduler::new(ensemble(), 3, FailurePolicy::Continue);

        let step = scheduler.start();
        assert_eq!(step.newly_scheduled, vec!["pre_process"]);
        assert!(!step.run_finished);

        let step = scheduler.handle_completion("pre_process", NodeOutcome::Success);
        assert_eq!(step.newly_scheduled, vec!["model1", "model2"]);

        let step = scheduler.handle_completion("model1", NodeOutcome::Success);
        assert!(step.newly_scheduled.is_empty());

        let step = scheduler.handle_completion("model2", NodeOutcome::Success);
        assert_eq!(step.newly_scheduled, vec!["ensemble"]);

        let step = scheduler.handle_completion("ensemble", NodeOutcome::Success);
        assert!(step.run_finished);
        assert!(scheduler.is_finished());
        assert_eq!(scheduler.nodes_in(NodeState::Success).len(), 4);
    }

    #[test]
    fn dispatch_respects_concurrency_budget() {
        let g = graph(&[("a", &[]), ("b", &[]), ("c", &[]), ("d", &[])]);
        let mut scheduler = Scheduler::new(g, 2, FailurePolicy::Continue);

        let step = scheduler.start();
        assert_eq!(step.newly_scheduled, vec!["a", "b"]);
        assert_eq!(scheduler.running_count(), 2);

        let step = scheduler.handle_completion("b", NodeOutcome::Success);
        assert_eq!(step.newly_scheduled, vec!["c"]);
        assert_eq!(scheduler.running_count(), 2);

        let step = scheduler.handle_completion("a", NodeOutcome::Success);
        assert_eq!(step.newly_scheduled, vec!["d"]);

        scheduler.handle_completion("c", NodeOutcome::Success);
        let step = scheduler.handle_completion("d", NodeOutcome::Success);
        assert!(step.run_finished);
    }

    #[test]
    fn failure_skips_transitive_dependents_only() {
        let g = graph(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &[]),
            ("d", &["b", "c"]),
        ]);
        let mut scheduler = Scheduler::new(g, 4, FailurePolicy::Continue);

        let step = scheduler.start();
        assert_eq!(step.newly_scheduled, vec!["a", "c"]);

        let step = scheduler.handle_completion("a", NodeOutcome::Failed);
        assert_eq!(step.newly_failed, vec!["a"]);
        assert_eq!(
            step.newly_skipped,
            vec![
                SkippedNode {
                    id: "b".into(),
                    blocked_by: "a".into()
                },
                SkippedNode {
                    id: "d".into(),
                    blocked_by: "a".into()
                },
            ]
        );
        assert!(step.newly_scheduled.is_empty());
        assert!(!step.run_finished);

        let step = scheduler.handle_completion("c", NodeOutcome::Success);
        assert!(step.newly_scheduled.is_empty());
        assert!(step.run_finished);

        assert_eq!(scheduler.state_of("c"), Some(NodeState::Success));
        assert_eq!(scheduler.state_of("d"), Some(NodeState::Skipped));
    }

    #[test]
    fn abort_policy_skips_everything_pending() {
        let g = graph(&[("a", &[]), ("b", &[]), ("c", &[]), ("d", &["c"])]);
        let mut scheduler = Scheduler::new(g, 2, FailurePolicy::Abort);

        let step = scheduler.start();
        assert_eq!(step.newly_scheduled, vec!["a", "b"]);

        let step = scheduler.handle_completion("a", NodeOutcome::Failed);
        let skipped: Vec<_> = step.newly_skipped.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(skipped, vec!["c", "d"]);
        assert!(step.newly_scheduled.is_empty());
        assert!(scheduler.is_aborted());
        assert!(!step.run_finished, "b is still running");

        let step = scheduler.handle_completion("b", NodeOutcome::Success);
        assert!(step.newly_scheduled.is_empty());
        assert!(step.run_finished);
        assert_eq!(scheduler.state_of("b"), Some(NodeState::Success));
    }

    #[test]
    fn stray_completions_are_ignored() {
        let g = graph(&[("a", &[]), ("b", &["a"])]);
        let mut scheduler = Scheduler::new(g, 1, FailurePolicy::Continue);
        scheduler.start();

        let step = scheduler.handle_completion("b", NodeOutcome::Success);
        assert!(step.newly_scheduled.is_empty());
        assert_eq!(scheduler.state_of("b"), Some(NodeState::Pending));

        let step = scheduler.handle_completion("nope", NodeOutcome::Failed);
        assert!(step.newly_failed.is_empty());

        scheduler.handle_completion("a", NodeOutcome::Success);
        let step = scheduler.handle_completion("a", NodeOutcome::Failed);
        assert!(step.newly_failed.is_empty());
        assert_eq!(scheduler.state_of("a"), Some(NodeState::Success));
    }

    #[test]
    fn empty_graph_finishes_immediately() {
        let mut scheduler = Scheduler::new(graph(&[]), 1, FailurePolicy::Continue);
        let step = scheduler.start();
        assert!(step.newly_scheduled.is_empty());
        assert!(step.run_finished);
    }
}
