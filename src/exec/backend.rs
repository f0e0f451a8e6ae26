// src/exec/backend.rs

//! Pluggable worker backend abstraction.
//!
//! The parallel runtime hands dispatched nodes to a `WorkerBackend` and
//! waits for [`NodeCompletion`]s on a channel. This keeps the coordinating
//! loop independent of where bodies actually run.
//!
//! - `BlockingPoolBackend` is the production implementation: every job runs
//!   on tokio's blocking thread pool, so a body may block for as long as it
//!   likes without stalling the coordinating loop.
//! - Tests can provide their own `WorkerBackend` that, for example, records
//!   dispatch order and reports scripted outcomes without running bodies.

use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::Result;
use crate::exec::worker::{run_node, NodeCompletion, NodeJob};
use crate::store::{OutputMap, ResultStore};

/// Trait abstracting how dispatched nodes are executed.
pub trait WorkerBackend<T>: Send {
    /// Start executing `job`. Must not wait for the body to finish; the
    /// completion is reported asynchronously.
    fn dispatch(&mut self, job: NodeJob<T>) -> Result<()>;
}

/// Runs each job on tokio's blocking pool and reports back over `tx`.
pub struct BlockingPoolBackend<T> {
    store: ResultStore<T>,
    outputs: OutputMap<T>,
    tx: mpsc::UnboundedSender<NodeCompletion>,
}

impl<T> BlockingPoolBackend<T> {
    pub fn new(
        store: ResultStore<T>,
        outputs: OutputMap<T>,
        tx: mpsc::UnboundedSender<NodeCompletion>,
    ) -> Self {
        Self { store, outputs, tx }
    }
}

impl<T> WorkerBackend<T> for BlockingPoolBackend<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn dispatch(&mut self, job: NodeJob<T>) -> Result<()> {
        // Clone the handles so the worker closure owns everything it touches.
        let store = self.store.clone();
        let outputs = self.outputs.clone();
        let tx = self.tx.clone();

        tokio::task::spawn_blocking(move || {
            let completion = run_node(job, &store, &outputs);
            if tx.send(completion).is_err() {
                debug!("completion receiver dropped; run loop already gone");
            }
        });

        Ok(())
    }
}
