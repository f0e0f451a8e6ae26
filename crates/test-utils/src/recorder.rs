use std::sync::{Arc, Mutex};

use taskdag::{Inputs, TaskNode};

/// One recorded body invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub id: String,
    /// `(input name, value)` pairs the body was handed.
    pub inputs: Vec<(String, String)>,
}

/// Shared log of body invocations, in call order.
#[derive(Debug, Clone, Default)]
pub struct InvocationLog {
    calls: Arc<Mutex<Vec<Invocation>>>,
}

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A node that records its invocation, then returns `"<id>-out"`.
    pub fn node(&self, id: &str) -> TaskNode<String> {
        let log = self.clone();
        let node_id = id.to_string();
        TaskNode::new(id, move |inputs: &Inputs<String>| {
            log.record(&node_id, inputs);
            Ok(format!("{node_id}-out"))
        })
    }

    /// A node that records its invocation, then fails.
    pub fn failing_node(&self, id: &str) -> TaskNode<String> {
        let log = self.clone();
        let node_id = id.to_string();
        TaskNode::new(id, move |inputs: &Inputs<String>| -> anyhow::Result<String> {
            log.record(&node_id, inputs);
            anyhow::bail!("{node_id} failed on purpose")
        })
    }

    pub fn record(&self, id: &str, inputs: &Inputs<String>) {
        let inputs = inputs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.calls.lock().unwrap().push(Invocation {
            id: id.to_string(),
            inputs,
        });
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Ids in call order.
    pub fn ids(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.id).collect()
    }

    pub fn was_invoked(&self, id: &str) -> bool {
        self.calls().iter().any(|c| c.id == id)
    }

    pub fn count_of(&self, id: &str) -> usize {
        self.calls().iter().filter(|c| c.id == id).count()
    }
}
