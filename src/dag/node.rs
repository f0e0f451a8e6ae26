// src/dag/node.rs

//! The unit of work: a named body plus its hard dependencies.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;

use crate::dag::NodeId;
use crate::errors::{Result, TaskDagError};

/// Callable body of a node.
///
/// It receives the published values of the node's hard dependencies, keyed by
/// each dependency's output name, and returns this node's value.
pub type TaskBody<T> = Arc<dyn Fn(&Inputs<T>) -> anyhow::Result<T> + Send + Sync>;

/// Values handed to a node body.
///
/// Assembled by the executor from the node's own hard dependencies only, so a
/// body can never observe outputs it did not declare a dependency on.
#[derive(Debug, Clone, PartialEq)]
pub struct Inputs<T> {
    values: BTreeMap<String, T>,
}

impl<T> Inputs<T> {
    pub fn new(values: BTreeMap<String, T>) -> Self {
        Self { values }
    }

    pub fn empty() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.values.get(name)
    }

    /// Like [`Inputs::get`], but a missing input is an error naming it, so
    /// bodies can simply use `?`.
    pub fn require(&self, name: &str) -> anyhow::Result<&T> {
        self.values.get(name).ok_or_else(|| {
            anyhow!(
                "missing input '{}' (available: {:?})",
                name,
                self.values.keys().collect::<Vec<_>>()
            )
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, T> {
        self.values
    }
}

impl<T> Default for Inputs<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// A node of the dependency graph.
pub struct TaskNode<T> {
    /// Unique identifier for this node.
    pub id: NodeId,
    /// IDs of nodes that must succeed before this node can run.
    pub hard_dependencies: BTreeSet<NodeId>,
    /// Key under which this node's value is published on success.
    pub output_name: String,
    body: TaskBody<T>,
}

impl<T> TaskNode<T> {
    /// Creates a node with no dependencies, publishing under its own id.
    pub fn new<F>(id: impl Into<NodeId>, body: F) -> Self
    where
        F: Fn(&Inputs<T>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::from_body(id, Arc::new(body))
    }

    /// Creates a node around an already shared body.
    pub fn from_body(id: impl Into<NodeId>, body: TaskBody<T>) -> Self {
        let id = id.into();
        Self {
            output_name: id.clone(),
            id,
            hard_dependencies: BTreeSet::new(),
            body,
        }
    }

    /// Adds a hard dependency to this node.
    pub fn depends_on(mut self, dep_id: impl Into<NodeId>) -> Self {
        self.hard_dependencies.insert(dep_id.into());
        self
    }

    /// Adds multiple hard dependencies to this node.
    pub fn depends_on_all(mut self, deps: impl IntoIterator<Item = impl Into<NodeId>>) -> Self {
        self.hard_dependencies
            .extend(deps.into_iter().map(Into::into));
        self
    }

    /// Sets the name this node's value is published under.
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// Shared handle to the body, for dispatching onto a worker.
    pub fn body(&self) -> TaskBody<T> {
        Arc::clone(&self.body)
    }

    /// Runs the body on the calling thread.
    pub fn invoke(&self, inputs: &Inputs<T>) -> anyhow::Result<T> {
        (self.body)(inputs)
    }
}

impl<T> Clone for TaskNode<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            hard_dependencies: self.hard_dependencies.clone(),
            output_name: self.output_name.clone(),
            body: Arc::clone(&self.body),
        }
    }
}

impl<T> fmt::Debug for TaskNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("id", &self.id)
            .field("hard_dependencies", &self.hard_dependencies)
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

/// Fail if two nodes publish under the same output name.
///
/// This is stricter than unique ids: the output map is keyed by output name,
/// so a shared name would hand a dependent whichever value landed first.
/// Takes `(node id, output name)` pairs.
pub fn ensure_unique_output_names<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<()> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();

    for (id, output) in pairs {
        if let Some(first) = seen.insert(output, id) {
            return Err(TaskDagError::DuplicateOutputName {
                output: output.to_string(),
                first: first.to_string(),
                second: id.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_defaults_to_id() {
        let node: TaskNode<u32> = TaskNode::new("a", |_| Ok(1));
        assert_eq!(node.output_name, "a");

        let node = node.with_output_name("alpha");
        assert_eq!(node.output_name, "alpha");
    }

    #[test]
    fn dependencies_are_deduplicated() {
        let node: TaskNode<u32> = TaskNode::new("c", |_| Ok(1))
            .depends_on("a")
            .depends_on_all(["b", "a"]);
        let deps: Vec<_> = node.hard_dependencies.iter().cloned().collect();
        assert_eq!(deps, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn invoke_passes_inputs_through() {
        let node: TaskNode<u32> =
            TaskNode::new("sum", |inputs| Ok(inputs.iter().map(|(_, v)| *v).sum()));
        let inputs = Inputs::new(BTreeMap::from([("x".to_string(), 2), ("y".to_string(), 3)]));
        assert_eq!(node.invoke(&inputs).unwrap(), 5);
    }

    #[test]
    fn shared_output_name_is_rejected() {
        assert!(ensure_unique_output_names([("a", "a"), ("b", "b")]).is_ok());

        let err = ensure_unique_output_names([("a", "df"), ("b", "x"), ("c", "df")]).unwrap_err();
        match err {
            TaskDagError::DuplicateOutputName { output, first, second } => {
                assert_eq!(output, "df");
                assert_eq!(first, "a");
                assert_eq!(second, "c");
            }
            other => panic!("expected DuplicateOutputName, got {other:?}"),
        }
    }

    #[test]
    fn require_names_missing_input() {
        let inputs: Inputs<u32> = Inputs::new(BTreeMap::from([("x".to_string(), 1)]));
        assert_eq!(*inputs.require("x").unwrap(), 1);

        let err = inputs.require("nope").unwrap_err().to_string();
        assert!(err.contains("nope"));
        assert!(err.contains("x"));
    }
}
