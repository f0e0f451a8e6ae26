// src/engine/runtime.rs

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::{DependencyGraph, NodeId, NodeState, Scheduler, SchedulerStep, SkippedNode, TaskNode};
use crate::errors::{Result, TaskDagError};
use crate::exec::{run_node, NodeCompletion, NodeJob, WorkerBackend};
use crate::store::{OutputMap, ResultStore};

/// Everything a run needs besides the scheduler: the node registry, the
/// graph, and the two shared stores.
pub struct RunContext<T> {
    nodes: Arc<BTreeMap<NodeId, TaskNode<T>>>,
    graph: Arc<DependencyGraph>,
    store: ResultStore<T>,
    outputs: OutputMap<T>,
}

impl<T> Clone for RunContext<T> {
    fn clone(&self) -> Self {
        Self {
            nodes: Arc::clone(&self.nodes),
            graph: Arc::clone(&self.graph),
            store: self.store.clone(),
            outputs: self.outputs.clone(),
        }
    }
}

impl<T: Clone> RunContext<T> {
    pub fn new(
        nodes: Arc<BTreeMap<NodeId, TaskNode<T>>>,
        graph: Arc<DependencyGraph>,
        store: ResultStore<T>,
        outputs: OutputMap<T>,
    ) -> Self {
        Self {
            nodes,
            graph,
            store,
            outputs,
        }
    }

    pub fn store(&self) -> &ResultStore<T> {
        &self.store
    }

    pub fn outputs(&self) -> &OutputMap<T> {
        &self.outputs
    }

    /// Mark a node `Running` and build its job.
    ///
    /// Called at dispatch, so `initial_time` is when the node left the
    /// ready set, before it waits for a free worker. Inputs are gathered
    /// from the output names of the node's own hard dependencies, nothing
    /// else.
    pub fn start_job(&self, id: &str) -> Result<NodeJob<T>> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| TaskDagError::Other(anyhow!("scheduled unknown node '{id}'")))?;
        self.store.mark_running(id, Instant::now());

        let input_names: Vec<&str> = self
            .graph
            .dependencies_of(id)
            .filter_map(|dep| self.nodes.get(dep))
            .map(|dep| dep.output_name.as_str())
            .collect();

        Ok(NodeJob {
            id: node.id.clone(),
            output_name: node.output_name.clone(),
            body: node.body(),
            inputs: self.outputs.gather(input_names),
        })
    }

    pub fn record_skips(&self, skipped: &[SkippedNode]) {
        for node in skipped {
            self.store.mark_skipped(&node.id, &node.blocked_by);
        }
    }
}

/// Async IO shell around the [`Scheduler`] for the parallel strategy.
///
/// The scheduler decides, the backend executes. This struct only moves
/// dispatched jobs to the backend and completions from the channel back into
/// the scheduler.
pub struct Runtime<T, B: WorkerBackend<T>> {
    ctx: RunContext<T>,
    backend: B,
    completion_rx: mpsc::UnboundedReceiver<NodeCompletion>,
}

impl<T, B: WorkerBackend<T>> fmt::Debug for Runtime<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("nodes", &self.ctx.nodes.len())
            .finish_non_exhaustive()
    }
}

impl<T: Clone, B: WorkerBackend<T>> Runtime<T, B> {
    pub fn new(
        ctx: RunContext<T>,
        backend: B,
        completion_rx: mpsc::UnboundedReceiver<NodeCompletion>,
    ) -> Self {
        Self {
            ctx,
            backend,
            completion_rx,
        }
    }

    /// Drive the scheduler until every node is terminal.
    pub async fn run(&mut self, scheduler: &mut Scheduler) -> Result<()> {
        info!(nodes = scheduler.graph().len(), "runtime started");

        let step = scheduler.start();
        let mut finished = self.apply_step(step)?;

        while !finished {
            if scheduler.running_count() == 0 {
                return Err(TaskDagError::Stalled(scheduler.nodes_in(NodeState::Pending)));
            }

            let completion = match self.completion_rx.recv().await {
                Some(c) => c,
                None => {
                    return Err(anyhow!(
                        "completion channel closed with {} node(s) still running",
                        scheduler.running_count()
                    )
                    .into());
                }
            };

            debug!(node = %completion.id, outcome = ?completion.outcome, "runtime received completion");

            let step = scheduler.handle_completion(&completion.id, completion.outcome);
            finished = self.apply_step(step)?;
        }

        info!("runtime exiting");
        Ok(())
    }

    fn apply_step(&mut self, step: SchedulerStep) -> Result<bool> {
        self.ctx.record_skips(&step.newly_skipped);

        if !step.newly_scheduled.is_empty() {
            debug!(nodes = ?step.newly_scheduled, "dispatching ready nodes");
        }
        for id in step.newly_scheduled.iter() {
            let job = self.ctx.start_job(id)?;
            self.backend.dispatch(job)?;
        }

        Ok(step.run_finished)
    }
}

/// Drive the scheduler on the calling thread, one body at a time.
///
/// Nodes run in the order the scheduler releases them. The scheduler should
/// be built with a concurrency of one, so at most one node is ever queued.
pub fn run_sequential<T: Clone>(scheduler: &mut Scheduler, ctx: &RunContext<T>) -> Result<()> {
    info!(nodes = scheduler.graph().len(), "sequential run started");

    let mut queue: VecDeque<NodeId> = VecDeque::new();
    let mut finished = enqueue_step(scheduler.start(), ctx, &mut queue);

    while !finished {
        let Some(id) = queue.pop_front() else {
            return Err(TaskDagError::Stalled(scheduler.nodes_in(NodeState::Pending)));
        };

        let job = ctx.start_job(&id)?;
        let completion = run_node(job, &ctx.store, &ctx.outputs);

        let step = scheduler.handle_completion(&completion.id, completion.outcome);
        finished = enqueue_step(step, ctx, &mut queue);
    }

    info!("sequential run finished");
    Ok(())
}

fn enqueue_step<T: Clone>(step: SchedulerStep, ctx: &RunContext<T>, queue: &mut VecDeque<NodeId>) -> bool {
    ctx.record_skips(&step.newly_skipped);
    queue.extend(step.newly_scheduled);
    step.run_finished
}
