// tests/property_graph.rs

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use proptest::prelude::*;
use taskdag::dag::{DependencyGraph, NodeOutcome, NodeState, Scheduler};
use taskdag::{Executor, ExecutorOptions, FailurePolicy, TaskNode};
use taskdag_test_utils::timeline::{assert_all_terminal, assert_causal_order};

/// Dependency lists for a random DAG. Acyclic by construction: node N may
/// only depend on nodes 0..N-1.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_nodes).prop_flat_map(|num_nodes| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_nodes),
            num_nodes,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    if i == 0 {
                        BTreeSet::new()
                    } else {
                        potential.into_iter().map(|d| d % i).collect()
                    }
                })
                .collect()
        })
    })
}

fn name(i: usize) -> String {
    format!("n{i:02}")
}

/// Each node returns its own id followed by the sorted `name=value` pairs it
/// received, so a value reveals exactly which inputs the body saw.
fn nodes_for(deps: &[BTreeSet<usize>], failing: &HashSet<usize>) -> Vec<TaskNode<String>> {
    deps.iter()
        .enumerate()
        .map(|(i, ds)| {
            let id = name(i);
            let fails = failing.contains(&i);
            let node_id = id.clone();
            TaskNode::new(id, move |inputs| {
                if fails {
                    anyhow::bail!("{node_id} failed");
                }
                let seen: Vec<String> = inputs.names().map(str::to_string).collect();
                Ok(format!("{node_id}[{}]", seen.join(",")))
            })
            .depends_on_all(ds.iter().map(|d| name(*d)))
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn graph_edges_equal_declared_dependencies(deps in dag_strategy(12)) {
        let nodes = nodes_for(&deps, &HashSet::new());
        let graph = DependencyGraph::build(&nodes).unwrap();

        let expected_nodes: BTreeSet<String> = (0..deps.len()).map(name).collect();
        let expected_edges: BTreeSet<(String, String)> = deps
            .iter()
            .enumerate()
            .flat_map(|(i, ds)| ds.iter().map(move |d| (name(*d), name(i))))
            .collect();

        prop_assert_eq!(graph.nodes(), expected_nodes);
        prop_assert_eq!(graph.edges(), expected_edges);
    }

    #[test]
    fn scheduler_terminates_and_respects_budget(
        deps in dag_strategy(12),
        failing in proptest::collection::hash_set(0..12usize, 0..4),
        max_concurrency in 1..4usize,
        abort in any::<bool>(),
    ) {
        let nodes = nodes_for(&deps, &HashSet::new());
        let graph = Arc::new(DependencyGraph::build(&nodes).unwrap());
        let policy = if abort { FailurePolicy::Abort } else { FailurePolicy::Continue };
        let mut scheduler = Scheduler::new(Arc::clone(&graph), max_concurrency, policy);

        let mut running: Vec<String> = scheduler.start().newly_scheduled;
        let mut steps = 0;

        while let Some(id) = running.pop() {
            steps += 1;
            prop_assert!(steps <= deps.len(), "more completions than nodes");

            // Dependencies of a dispatched node have all succeeded.
            for dep in graph.dependencies_of(&id) {
                prop_assert_eq!(scheduler.state_of(dep), Some(NodeState::Success));
            }

            let idx: usize = id[1..].parse().unwrap();
            let outcome = if failing.contains(&idx) { NodeOutcome::Failed } else { NodeOutcome::Success };
            let step = scheduler.handle_completion(&id, outcome);
            running.extend(step.newly_scheduled);

            prop_assert!(scheduler.running_count() <= max_concurrency);
        }

        prop_assert!(scheduler.is_finished());
    }

    #[test]
    fn executor_runs_every_node_with_exactly_its_inputs(
        deps in dag_strategy(10),
        failing in proptest::collection::hash_set(0..10usize, 0..3),
    ) {
        let nodes = nodes_for(&deps, &failing);
        let executor = Executor::new(nodes, ExecutorOptions::new("prop").max_concurrency(3)).unwrap();
        let report = executor.execute().unwrap();

        assert_all_terminal(&executor);
        assert_causal_order(&executor);
        prop_assert_eq!(report.is_success(), report.succeeded.len() == deps.len());

        for (i, ds) in deps.iter().enumerate() {
            let entry = executor.result(&name(i)).unwrap();
            let upstream_failed = ds.iter().any(|d| {
                executor.result(&name(*d)).map(|e| e.state) != Some(NodeState::Success)
            });

            if upstream_failed {
                prop_assert_eq!(entry.state, NodeState::Skipped);
            } else if failing.contains(&i) {
                prop_assert_eq!(entry.state, NodeState::Failed);
            } else {
                let expected_inputs: Vec<String> = ds.iter().map(|d| name(*d)).collect();
                let expected = format!("{}[{}]", name(i), expected_inputs.join(","));
                prop_assert_eq!(entry.output(), Some(&expected));
            }
        }
    }
}
