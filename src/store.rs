// src/store.rs

//! Shared run state: per-node telemetry and published outputs.
//!
//! Both stores are cheap to clone (`Arc` inside) and are shared between the
//! coordinating loop and the workers. Every write happens under a single
//! write lock, so a reader sees either the previous entry or the complete
//! new one, never a mix of the two.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::dag::{Inputs, NodeId, NodeState};

/// Value recorded for a finished node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue<T> {
    /// What the body returned.
    Output(T),
    /// The error chain (or panic message) the body failed with.
    Failure(String),
}

impl<T> NodeValue<T> {
    pub fn output(&self) -> Option<&T> {
        match self {
            NodeValue::Output(v) => Some(v),
            NodeValue::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            NodeValue::Output(_) => None,
            NodeValue::Failure(msg) => Some(msg),
        }
    }
}

/// Telemetry for a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntry<T> {
    pub state: NodeState,
    /// When the node was dispatched.
    pub initial_time: Option<Instant>,
    /// When the body returned.
    pub final_time: Option<Instant>,
    pub value: Option<NodeValue<T>>,
    /// For skipped nodes: the failed node that caused the skip.
    pub blocked_by: Option<NodeId>,
}

impl<T> ResultEntry<T> {
    fn pending() -> Self {
        Self {
            state: NodeState::Pending,
            initial_time: None,
            final_time: None,
            value: None,
            blocked_by: None,
        }
    }

    /// Wall time the body took, once it has finished.
    pub fn duration(&self) -> Option<Duration> {
        match (self.initial_time, self.final_time) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        }
    }

    pub fn output(&self) -> Option<&T> {
        self.value.as_ref().and_then(NodeValue::output)
    }

    pub fn failure(&self) -> Option<&str> {
        self.value.as_ref().and_then(NodeValue::failure)
    }
}

/// Per-node result records.
///
/// Transitions are monotonic: an entry only moves forward
/// (`Pending -> Running -> Success | Failed`, or `Pending -> Skipped`), and
/// each terminal record is written exactly once. Out-of-order writes are
/// refused and logged.
#[derive(Debug)]
pub struct ResultStore<T> {
    entries: Arc<RwLock<HashMap<NodeId, ResultEntry<T>>>>,
}

impl<T> Clone for ResultStore<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T: Clone> ResultStore<T> {
    /// Create a store with a `Pending` entry for every id.
    pub fn new<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let entries = ids
            .into_iter()
            .map(|id| (id.to_string(), ResultEntry::pending()))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Record dispatch: state `Running` plus `initial_time`.
    pub fn mark_running(&self, id: &str, at: Instant) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(id) {
            Some(entry) if entry.state == NodeState::Pending => {
                entry.state = NodeState::Running;
                entry.initial_time = Some(at);
                true
            }
            other => {
                warn!(node = %id, state = ?other.map(|e| e.state), "refusing to mark node running");
                false
            }
        }
    }

    /// Record completion: terminal state, `final_time` and value together.
    pub fn finalize(&self, id: &str, state: NodeState, value: NodeValue<T>, at: Instant) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(id) {
            Some(entry)
                if entry.state == NodeState::Running
                    && matches!(state, NodeState::Success | NodeState::Failed) =>
            {
                entry.state = state;
                entry.final_time = Some(at);
                entry.value = Some(value);
                true
            }
            other => {
                warn!(
                    node = %id,
                    state = ?other.map(|e| e.state),
                    requested = %state,
                    "refusing to finalize node"
                );
                false
            }
        }
    }

    /// Record that a node will never run because `blocked_by` failed.
    pub fn mark_skipped(&self, id: &str, blocked_by: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(id) {
            Some(entry) if entry.state == NodeState::Pending => {
                entry.state = NodeState::Skipped;
                entry.blocked_by = Some(blocked_by.to_string());
                true
            }
            other => {
                warn!(node = %id, state = ?other.map(|e| e.state), "refusing to mark node skipped");
                false
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<ResultEntry<T>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn state_of(&self, id: &str) -> Option<NodeState> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|e| e.state)
    }

    /// Copy of every entry, keyed by node id.
    pub fn snapshot(&self) -> BTreeMap<NodeId, ResultEntry<T>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect()
    }
}

/// Published node values, keyed by output name.
///
/// Append-only: each output name is written once, by the worker that ran the
/// node, before that node's completion is reported. Dependents only read
/// after observing that completion.
#[derive(Debug)]
pub struct OutputMap<T> {
    values: Arc<RwLock<HashMap<String, T>>>,
}

impl<T> Clone for OutputMap<T> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
        }
    }
}

impl<T> Default for OutputMap<T> {
    fn default() -> Self {
        Self {
            values: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T: Clone> OutputMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a value. A second publish under the same name is refused.
    pub fn publish(&self, name: &str, value: T) -> bool {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        if values.contains_key(name) {
            warn!(output = %name, "output already published; keeping the first value");
            return false;
        }
        values.insert(name.to_string(), value);
        true
    }

    pub fn get(&self, name: &str) -> Option<T> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Assemble the inputs for a node from the given output names only.
    ///
    /// Names that were never published are left out.
    pub fn gather<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Inputs<T> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        let picked = names
            .into_iter()
            .filter_map(|name| values.get(name).map(|v| (name.to_string(), v.clone())))
            .collect();
        Inputs::new(picked)
    }

    pub fn len(&self) -> usize {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_moves_forward_only() {
        let store: ResultStore<u32> = ResultStore::new(["a"]);
        let t0 = Instant::now();

        assert!(!store.finalize("a", NodeState::Success, NodeValue::Output(1), t0));
        assert!(store.mark_running("a", t0));
        assert!(!store.mark_running("a", t0));

        let t1 = Instant::now();
        assert!(store.finalize("a", NodeState::Success, NodeValue::Output(7), t1));
        assert!(!store.finalize("a", NodeState::Failed, NodeValue::Failure("late".into()), t1));
        assert!(!store.mark_skipped("a", "x"));

        let entry = store.get("a").unwrap();
        assert_eq!(entry.state, NodeState::Success);
        assert_eq!(entry.output(), Some(&7));
        assert_eq!(entry.initial_time, Some(t0));
        assert_eq!(entry.final_time, Some(t1));
        assert!(entry.duration().is_some());
    }

    #[test]
    fn finalize_rejects_non_terminal_target() {
        let store: ResultStore<u32> = ResultStore::new(["a"]);
        store.mark_running("a", Instant::now());
        assert!(!store.finalize("a", NodeState::Skipped, NodeValue::Output(1), Instant::now()));
        assert_eq!(store.state_of("a"), Some(NodeState::Running));
    }

    #[test]
    fn skipped_entry_records_cause() {
        let store: ResultStore<u32> = ResultStore::new(["a", "b"]);
        assert!(store.mark_skipped("b", "a"));

        let entry = store.get("b").unwrap();
        assert_eq!(entry.state, NodeState::Skipped);
        assert_eq!(entry.blocked_by.as_deref(), Some("a"));
        assert!(entry.initial_time.is_none());
        assert!(entry.value.is_none());

        assert!(store.get("missing").is_none());
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn outputs_are_publish_once_and_gathered_selectively() {
        let outputs: OutputMap<String> = OutputMap::new();
        assert!(outputs.publish("x", "one".into()));
        assert!(!outputs.publish("x", "two".into()));
        assert!(outputs.publish("y", "why".into()));
        assert!(outputs.publish("z", "zed".into()));

        assert_eq!(outputs.get("x").as_deref(), Some("one"));
        assert_eq!(outputs.len(), 3);

        let inputs = outputs.gather(["x", "z", "never"]);
        assert_eq!(inputs.names().collect::<Vec<_>>(), vec!["x", "z"]);
        assert_eq!(inputs.get("z").map(String::as_str), Some("zed"));
        assert!(inputs.get("y").is_none());
    }
}
