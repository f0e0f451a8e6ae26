// src/lib.rs

//! `taskdag`: a concurrent dependency-graph task executor.
//!
//! Build a set of [`TaskNode`]s, hand them to an [`Executor`], and call
//! [`Executor::execute`]. Each node runs exactly once, as soon as all of its
//! hard dependencies have succeeded, with at most `max_concurrency` bodies
//! running at a time. A node receives the published values of its own
//! dependencies (and nothing else) as [`Inputs`]. Per-node timing, state and
//! value are recorded and stay available after the run.
//!
//! The `taskdag` binary is a thin client on top: it loads a TOML pipeline
//! whose nodes are shell commands (see [`config`] and [`exec::command`]).

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod store;
pub mod types;

use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::PipelineFile;
use crate::exec::command::pipeline_nodes;

pub use crate::config::ExecutorOptions;
pub use crate::dag::{DependencyGraph, Inputs, NodeId, NodeState, TaskBody, TaskNode};
pub use crate::engine::{Executor, RegistryEntry, RunOutcome, RunReport};
pub use crate::errors::TaskDagError;
pub use crate::store::{NodeValue, ResultEntry};
pub use crate::types::{ExecutionStrategy, FailurePolicy};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - pipeline loading and validation
/// - CLI overrides of the `[executor]` section
/// - `--dry-run` / `--dot` output
/// - the run itself, followed by a per-node summary on stdout
///
/// Returns an error when the run fails, so the process exits non-zero.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut pipeline = load_and_validate(&config_path)?;
    apply_overrides(&mut pipeline, &args);

    if args.dry_run {
        print_dry_run(&pipeline);
        return Ok(());
    }

    let executor = Executor::new(pipeline_nodes(&pipeline), pipeline.executor.clone())?;

    if args.dot {
        print!("{}", executor.graph_view().to_dot());
        return Ok(());
    }

    info!(config = %config_path.display(), "running pipeline");
    let report = executor.execute_async().await?;
    print_summary(&executor, &report);

    if !report.is_success() {
        bail!(
            "run '{}' failed: {}",
            report.name,
            report.non_succeeding().join(", ")
        );
    }

    Ok(())
}

fn apply_overrides(pipeline: &mut PipelineFile, args: &CliArgs) {
    if let Some(n) = args.max_concurrency {
        debug!(max_concurrency = n, "overriding max_concurrency from CLI");
        pipeline.executor.max_concurrency = n;
    }
    if let Some(policy) = args.failure_policy {
        debug!(?policy, "overriding failure_policy from CLI");
        pipeline.executor.failure_policy = policy;
    }
    if args.sequential {
        debug!("--sequential given; running nodes one at a time");
        pipeline.executor.strategy = ExecutionStrategy::Sequential;
    }
}

/// Simple dry-run output: print the executor settings, nodes, deps and
/// commands.
fn print_dry_run(pipeline: &PipelineFile) {
    let executor = &pipeline.executor;
    println!("taskdag dry-run: {}", executor.name);
    println!("  executor.max_concurrency = {}", executor.max_concurrency);
    println!("  executor.strategy = {}", executor.strategy);
    println!("  executor.failure_policy = {:?}", executor.failure_policy);
    println!();

    println!("nodes ({}):", pipeline.node.len());
    for (id, node) in pipeline.node.iter() {
        println!("  - {id}");
        println!("      cmd: {}", node.cmd);
        if !node.after.is_empty() {
            println!("      after: {:?}", node.after);
        }
        if let Some(ref output) = node.output {
            println!("      output: {output}");
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_summary(executor: &Executor<String>, report: &RunReport) {
    println!("{report}");

    for (id, entry) in executor.node_registry() {
        let duration = entry
            .result
            .duration()
            .map(|d| format!("{d:.2?}"))
            .unwrap_or_else(|| "-".to_string());

        let detail = match (&entry.result.value, &entry.result.blocked_by) {
            (Some(NodeValue::Output(value)), _) => value.clone(),
            (Some(NodeValue::Failure(message)), _) => message.clone(),
            (None, Some(blocked_by)) => format!("blocked by {blocked_by}"),
            (None, None) => String::new(),
        };

        println!("  {id:<20} {:<8} {duration:>10}  {detail}", entry.result.state.to_string());
    }
}
