use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use taskdag::dag::NodeOutcome;
use taskdag::errors::Result;
use taskdag::exec::{NodeCompletion, NodeJob, WorkerBackend};

/// A fake backend that:
/// - records which nodes were dispatched, in order, with their input names
/// - never invokes a body
/// - immediately reports a completion: `Failed` for ids in `failing`,
///   `Success` otherwise.
pub struct ScriptedBackend {
    completion_tx: mpsc::UnboundedSender<NodeCompletion>,
    failing: BTreeSet<String>,
    dispatched: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl ScriptedBackend {
    pub fn new(
        completion_tx: mpsc::UnboundedSender<NodeCompletion>,
        failing: &[&str],
        dispatched: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    ) -> Self {
        Self {
            completion_tx,
            failing: failing.iter().map(|s| s.to_string()).collect(),
            dispatched,
        }
    }
}

impl<T> WorkerBackend<T> for ScriptedBackend {
    fn dispatch(&mut self, job: NodeJob<T>) -> Result<()> {
        {
            let mut guard = self.dispatched.lock().unwrap();
            guard.push((
                job.id.clone(),
                job.inputs.names().map(str::to_string).collect(),
            ));
        }

        let outcome = if self.failing.contains(&job.id) {
            NodeOutcome::Failed
        } else {
            NodeOutcome::Success
        };

        self.completion_tx
            .send(NodeCompletion { id: job.id, outcome })
            .map_err(anyhow::Error::from)?;
        Ok(())
    }
}
