// src/engine/executor.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::anyhow;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::config::ExecutorOptions;
use crate::dag::node::ensure_unique_output_names;
use crate::dag::{DependencyGraph, NodeId, Scheduler, TaskNode};
use crate::engine::report::RunReport;
use crate::engine::runtime::{run_sequential, RunContext, Runtime};
use crate::errors::{Result, TaskDagError};
use crate::exec::BlockingPoolBackend;
use crate::store::{OutputMap, ResultEntry, ResultStore};
use crate::types::ExecutionStrategy;

/// A node together with its current result record.
#[derive(Debug, Clone)]
pub struct RegistryEntry<'a, T> {
    pub node: &'a TaskNode<T>,
    pub result: ResultEntry<T>,
}

/// Runs a validated set of nodes once.
///
/// Construction builds and validates the dependency graph; nothing runs
/// until [`Executor::execute`] (or [`Executor::execute_async`]) is called.
/// After the run the registry, graph view and outputs stay available for
/// inspection.
///
/// ```no_run
/// use taskdag::{Executor, ExecutorOptions, TaskNode};
///
/// let nodes = vec![
///     TaskNode::<i64>::new("load", |_| Ok(21)),
///     TaskNode::<i64>::new("double", |inputs| Ok(*inputs.require("load")? * 2))
///         .depends_on("load"),
/// ];
/// let executor = Executor::new(nodes, ExecutorOptions::new("demo")).unwrap();
/// let report = executor.execute().unwrap();
/// assert!(report.is_success());
/// assert_eq!(executor.output("double"), Some(42));
/// ```
pub struct Executor<T> {
    options: ExecutorOptions,
    nodes: Arc<BTreeMap<NodeId, TaskNode<T>>>,
    graph: Arc<DependencyGraph>,
    store: ResultStore<T>,
    outputs: OutputMap<T>,
    executed: AtomicBool,
}

impl<T> fmt::Debug for Executor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("options", &self.options)
            .field("graph", &self.graph)
            .field("executed", &self.executed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<T> Executor<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Validate the options and the node set, and build the graph.
    ///
    /// Fails before anything runs on a duplicate id, an unknown dependency,
    /// a cycle, a shared output name, or `max_concurrency = 0`.
    pub fn new(nodes: Vec<TaskNode<T>>, options: ExecutorOptions) -> Result<Self> {
        options.validate()?;

        let graph = DependencyGraph::build(&nodes)?;
        ensure_unique_output_names(
            nodes
                .iter()
                .map(|n| (n.id.as_str(), n.output_name.as_str())),
        )?;

        let store = ResultStore::new(graph.node_ids());
        let nodes: BTreeMap<NodeId, TaskNode<T>> =
            nodes.into_iter().map(|n| (n.id.clone(), n)).collect();

        info!(
            executor = %options.name,
            nodes = graph.len(),
            edges = graph.edges().len(),
            strategy = %options.strategy,
            max_concurrency = options.max_concurrency,
            "executor built"
        );

        Ok(Self {
            options,
            nodes: Arc::new(nodes),
            graph: Arc::new(graph),
            store,
            outputs: OutputMap::new(),
            executed: AtomicBool::new(false),
        })
    }

    /// Run every node to a terminal state, blocking the calling thread.
    ///
    /// The parallel strategy builds its own tokio runtime. When called from
    /// inside a runtime, that private runtime is driven from a scoped thread,
    /// so the call still blocks but never panics. Async callers should
    /// prefer [`Executor::execute_async`], which does not block a worker.
    #[instrument(name = "executor_run", skip(self), fields(executor = %self.options.name))]
    pub fn execute(&self) -> Result<RunReport> {
        self.claim_run()?;
        let started = Instant::now();

        match self.options.strategy {
            ExecutionStrategy::Sequential => {
                let mut scheduler = self.scheduler(1);
                run_sequential(&mut scheduler, &self.context())?;
            }
            ExecutionStrategy::Parallel => {
                if Handle::try_current().is_ok() {
                    // A runtime cannot be blocked on from inside another one;
                    // drive the run from a scoped thread of our own instead.
                    debug!("execute() called inside a tokio runtime; running on a scoped thread");
                    thread::scope(|scope| {
                        scope
                            .spawn(|| self.block_on_parallel())
                            .join()
                            .map_err(|_| anyhow!("parallel run thread panicked"))
                    })??;
                } else {
                    self.block_on_parallel()?;
                }
            }
        }

        Ok(self.finish(started))
    }

    /// Same as [`Executor::execute`], for callers already on a tokio runtime.
    ///
    /// The sequential strategy runs on a single blocking thread so the
    /// caller's runtime is never stalled.
    #[instrument(name = "executor_run", skip(self), fields(executor = %self.options.name))]
    pub async fn execute_async(&self) -> Result<RunReport> {
        self.claim_run()?;
        let started = Instant::now();

        match self.options.strategy {
            ExecutionStrategy::Sequential => {
                let mut scheduler = self.scheduler(1);
                let ctx = self.context();
                tokio::task::spawn_blocking(move || run_sequential(&mut scheduler, &ctx))
                    .await
                    .map_err(|err| anyhow!("sequential run did not complete: {err}"))??;
            }
            ExecutionStrategy::Parallel => self.run_parallel().await?,
        }

        Ok(self.finish(started))
    }

    fn block_on_parallel(&self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .max_blocking_threads(self.options.max_concurrency)
            .build()?;
        runtime.block_on(self.run_parallel())
    }

    async fn run_parallel(&self) -> Result<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = BlockingPoolBackend::new(self.store.clone(), self.outputs.clone(), tx);
        let mut scheduler = self.scheduler(self.options.max_concurrency);

        let mut runtime = Runtime::new(self.context(), backend, rx);
        runtime.run(&mut scheduler).await
    }

    fn claim_run(&self) -> Result<()> {
        if self.executed.swap(true, Ordering::SeqCst) {
            return Err(TaskDagError::AlreadyExecuted(self.options.name.clone()));
        }
        info!(strategy = %self.options.strategy, policy = ?self.options.failure_policy, "run started");
        Ok(())
    }

    fn scheduler(&self, max_concurrency: usize) -> Scheduler {
        Scheduler::new(
            Arc::clone(&self.graph),
            max_concurrency,
            self.options.failure_policy,
        )
    }

    fn context(&self) -> RunContext<T> {
        RunContext::new(
            Arc::clone(&self.nodes),
            Arc::clone(&self.graph),
            self.store.clone(),
            self.outputs.clone(),
        )
    }

    fn finish(&self, started: Instant) -> RunReport {
        let report = RunReport::from_entries(&self.options.name, &self.store.snapshot(), started.elapsed());

        if report.is_success() {
            info!(elapsed = ?report.elapsed, nodes = report.succeeded.len(), "run succeeded");
        } else {
            warn!(
                elapsed = ?report.elapsed,
                failed = ?report.failed,
                skipped = ?report.skipped,
                "run failed"
            );
        }

        report
    }
}

impl<T: Clone> Executor<T> {
    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Structural view: node-id set and `(dependency, dependent)` edge set.
    pub fn graph_view(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn node(&self, id: &str) -> Option<&TaskNode<T>> {
        self.nodes.get(id)
    }

    /// Current result record of a node.
    pub fn result(&self, id: &str) -> Option<ResultEntry<T>> {
        self.store.get(id)
    }

    /// Every result record, keyed by node id.
    pub fn results(&self) -> BTreeMap<NodeId, ResultEntry<T>> {
        self.store.snapshot()
    }

    /// Every node with its result record, keyed by node id.
    ///
    /// The records are taken from one consistent snapshot.
    pub fn node_registry(&self) -> BTreeMap<&str, RegistryEntry<'_, T>> {
        let mut results = self.store.snapshot();
        self.nodes
            .iter()
            .filter_map(|(id, node)| {
                results.remove(id).map(|result| {
                    (id.as_str(), RegistryEntry { node, result })
                })
            })
            .collect()
    }

    /// A published value, by output name.
    pub fn output(&self, output_name: &str) -> Option<T> {
        self.outputs.get(output_name)
    }

    pub fn has_executed(&self) -> bool {
        self.executed.load(Ordering::SeqCst)
    }
}
