// src/exec/worker.rs

//! Runs a single node body and records what happened.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::dag::{Inputs, NodeId, NodeOutcome, NodeState, TaskBody};
use crate::store::{NodeValue, OutputMap, ResultStore};

/// Everything a worker needs to run one node.
pub struct NodeJob<T> {
    pub id: NodeId,
    pub output_name: String,
    pub body: TaskBody<T>,
    pub inputs: Inputs<T>,
}

/// Completion signal sent from a worker back to the coordinating loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCompletion {
    pub id: NodeId,
    pub outcome: NodeOutcome,
}

/// Invoke the node body on the current thread.
///
/// The node's result entry must already be `Running` (the dispatcher marks
/// it). The worker publishes the output (on success) and finalizes the entry
/// *before* returning the completion. Whoever acts on the completion is therefore
/// guaranteed to see the published value.
///
/// Body errors and panics are captured as `Failed`; they never unwind into
/// the caller.
pub fn run_node<T: Clone>(
    job: NodeJob<T>,
    store: &ResultStore<T>,
    outputs: &OutputMap<T>,
) -> NodeCompletion {
    let NodeJob {
        id,
        output_name,
        body,
        inputs,
    } = job;

    debug!(
        node = %id,
        inputs = ?inputs.names().collect::<Vec<_>>(),
        "invoking node body"
    );

    let result = panic::catch_unwind(AssertUnwindSafe(|| body(&inputs)));
    let finished = Instant::now();

    let outcome = match result {
        Ok(Ok(value)) => {
            outputs.publish(&output_name, value.clone());
            store.finalize(&id, NodeState::Success, NodeValue::Output(value), finished);
            info!(node = %id, output = %output_name, "node succeeded");
            NodeOutcome::Success
        }
        Ok(Err(err)) => {
            let message = format!("{err:#}");
            warn!(node = %id, error = %message, "node failed");
            store.finalize(&id, NodeState::Failed, NodeValue::Failure(message), finished);
            NodeOutcome::Failed
        }
        Err(payload) => {
            let message = format!("node panicked: {}", panic_message(payload.as_ref()));
            warn!(node = %id, error = %message, "node panicked");
            store.finalize(&id, NodeState::Failed, NodeValue::Failure(message), finished);
            NodeOutcome::Failed
        }
    };

    NodeCompletion { id, outcome }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
