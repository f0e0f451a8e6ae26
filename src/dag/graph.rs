// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::dot::{Config, Dot};
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::node::TaskNode;
use crate::dag::state::NodeState;
use crate::dag::NodeId;
use crate::errors::{Result, TaskDagError};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: nodes that must succeed before this one can run.
    deps: BTreeSet<NodeId>,
    /// Direct dependents: nodes that list this one as a hard dependency.
    dependents: BTreeSet<NodeId>,
}

/// Immutable dependency graph, keyed by node id.
///
/// Edges run from a dependency to its dependent. Construction validates the
/// whole structure up front (unique ids, resolvable dependencies, no cycles),
/// so every method here can assume a well-formed DAG.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: BTreeMap<NodeId, DagNode>,
    topo_order: Vec<NodeId>,
}

impl DependencyGraph {
    /// Build and validate the graph for the given nodes.
    pub fn build<T>(nodes: &[TaskNode<T>]) -> Result<Self> {
        Self::from_declarations(
            nodes
                .iter()
                .map(|n| (n.id.clone(), n.hard_dependencies.clone())),
        )
    }

    /// Build and validate a graph from `(id, hard dependencies)` pairs.
    ///
    /// Fails with:
    /// - [`TaskDagError::DuplicateId`] if an id is declared twice,
    /// - [`TaskDagError::UnknownDependency`] if a dependency is not declared,
    /// - [`TaskDagError::CycleDetected`] if the dependency relation has a
    ///   cycle (including a node depending on itself).
    pub fn from_declarations<I>(declarations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NodeId, BTreeSet<NodeId>)>,
    {
        let mut nodes: BTreeMap<NodeId, DagNode> = BTreeMap::new();

        // First pass: create nodes with their dependency sets.
        for (id, deps) in declarations {
            if nodes.contains_key(&id) {
                return Err(TaskDagError::DuplicateId(id));
            }
            nodes.insert(
                id,
                DagNode {
                    deps,
                    dependents: BTreeSet::new(),
                },
            );
        }

        // Second pass: resolve every dependency and populate dependents.
        let mut edges: Vec<(NodeId, NodeId)> = Vec::new();
        for (id, node) in nodes.iter() {
            for dep in node.deps.iter() {
                if dep == id {
                    return Err(TaskDagError::CycleDetected(vec![id.clone()]));
                }
                if !nodes.contains_key(dep) {
                    return Err(TaskDagError::UnknownDependency {
                        node: id.clone(),
                        dependency: dep.clone(),
                    });
                }
                edges.push((dep.clone(), id.clone()));
            }
        }
        for (dep, dependent) in edges {
            if let Some(dep_node) = nodes.get_mut(&dep) {
                dep_node.dependents.insert(dependent);
            }
        }

        let topo_order = topological_sort(&nodes)?;
        debug!(nodes = nodes.len(), "dependency graph built");

        Ok(Self { nodes, topo_order })
    }

    /// The full node-id set.
    pub fn nodes(&self) -> BTreeSet<NodeId> {
        self.nodes.keys().cloned().collect()
    }

    /// The full `(dependency, dependent)` edge set.
    pub fn edges(&self) -> BTreeSet<(NodeId, NodeId)> {
        self.nodes
            .iter()
            .flat_map(|(id, node)| node.deps.iter().map(move |dep| (dep.clone(), id.clone())))
            .collect()
    }

    /// Iterate node ids in ascending order without allocating.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn has_edge(&self, dependency: &str, dependent: &str) -> bool {
        self.nodes
            .get(dependent)
            .is_some_and(|n| n.deps.contains(dependency))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Immediate hard dependencies of a node.
    pub fn dependencies_of<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|n| n.deps.iter().map(String::as_str))
    }

    /// Immediate dependents of a node.
    pub fn dependents_of<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|n| n.dependents.iter().map(String::as_str))
    }

    /// Every node reachable from `id` along dependency edges, excluding `id`.
    pub fn descendants_of(&self, id: &str) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = self.dependents_of(id).collect();

        while let Some(name) = stack.pop() {
            if seen.insert(name.to_string()) {
                stack.extend(self.dependents_of(name));
            }
        }

        seen
    }

    /// Nodes without hard dependencies.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.deps.is_empty())
            .map(|(id, _)| id.as_str())
    }

    /// A topological order: every dependency precedes its dependents.
    pub fn topological_order(&self) -> &[NodeId] {
        &self.topo_order
    }

    /// Nodes that are still `Pending` and whose hard dependencies have all
    /// reached `Success`, in ascending id order.
    ///
    /// Ids missing from `states` count as `Pending`.
    pub fn ready_set(&self, states: &BTreeMap<NodeId, NodeState>) -> Vec<&str> {
        let state_of = |id: &str| states.get(id).copied().unwrap_or(NodeState::Pending);

        self.nodes
            .iter()
            .filter(|(id, node)| {
                state_of(id.as_str()) == NodeState::Pending
                    && node
                        .deps
                        .iter()
                        .all(|dep| state_of(dep.as_str()) == NodeState::Success)
            })
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Render the graph in Graphviz DOT format.
    pub fn to_dot(&self) -> String {
        let mut graph: DiGraphMap<&str, &str> = DiGraphMap::new();
        for id in self.nodes.keys() {
            graph.add_node(id.as_str());
        }
        for (id, node) in self.nodes.iter() {
            for dep in node.deps.iter() {
                graph.add_edge(dep.as_str(), id.as_str(), "");
            }
        }

        format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }
}

/// Topologically sort the nodes, reporting the members of a cycle if there
/// is one.
fn topological_sort(nodes: &BTreeMap<NodeId, DagNode>) -> Result<Vec<NodeId>> {
    // Edge direction: dep -> node.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in nodes.keys() {
        graph.add_node(id.as_str());
    }
    for (id, node) in nodes.iter() {
        for dep in node.deps.iter() {
            graph.add_edge(dep.as_str(), id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => {
            let offender = cycle.node_id();
            let mut members: Vec<NodeId> = tarjan_scc(&graph)
                .into_iter()
                .find(|scc| scc.contains(&offender))
                .unwrap_or_else(|| vec![offender])
                .into_iter()
                .map(str::to_string)
                .collect();
            members.sort();
            Err(TaskDagError::CycleDetected(members))
        }
    }
}
