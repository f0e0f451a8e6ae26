// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::errors::{Result, TaskDagError};
use crate::types::{ExecutionStrategy, FailurePolicy};

/// Executor settings.
///
/// Used directly when building an [`Executor`](crate::Executor) in code, and
/// as the `[executor]` section of a pipeline file:
///
/// ```toml
/// [executor]
/// name = "Ensemble test example"
/// max_concurrency = 3
/// strategy = "parallel"      # or "sequential"
/// failure_policy = "continue" # or "abort"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExecutorOptions {
    /// Human readable name, used in logs and reports.
    #[serde(default = "default_name")]
    pub name: String,

    /// Maximum number of node bodies running at the same time. Must be >= 1.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default)]
    pub strategy: ExecutionStrategy,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_name() -> String {
    "taskdag".to_string()
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_concurrency: default_max_concurrency(),
            strategy: ExecutionStrategy::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl ExecutorOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    pub fn strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Debug mode runs every node sequentially on the calling thread.
    pub fn debug(self, enabled: bool) -> Self {
        if enabled {
            self.strategy(ExecutionStrategy::Sequential)
        } else {
            self.strategy(ExecutionStrategy::Parallel)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(TaskDagError::ConfigError(format!(
                "executor '{}': max_concurrency must be >= 1 (got 0)",
                self.name
            )));
        }
        Ok(())
    }
}

/// Pipeline file as read from TOML, before validation.
///
/// ```toml
/// [executor]
/// max_concurrency = 3
///
/// [node.pre_process]
/// cmd = "echo features"
/// output = "my_cool_df"
///
/// [node.model1]
/// cmd = "echo model1 on $TASKDAG_INPUT_MY_COOL_DF"
/// after = ["pre_process"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawPipelineFile {
    #[serde(default)]
    pub executor: ExecutorOptions,

    /// All nodes from `[node.<id>]`, keyed by node id.
    #[serde(default)]
    pub node: BTreeMap<String, NodeConfig>,
}

/// A validated pipeline. Only obtainable through `TryFrom<RawPipelineFile>`.
#[derive(Debug, Clone)]
pub struct PipelineFile {
    pub executor: ExecutorOptions,
    pub node: BTreeMap<String, NodeConfig>,
}

impl PipelineFile {
    pub(crate) fn new_unchecked(
        executor: ExecutorOptions,
        node: BTreeMap<String, NodeConfig>,
    ) -> Self {
        Self { executor, node }
    }
}

/// `[node.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Shell command to execute. Its trimmed stdout is the node's value.
    pub cmd: String,

    /// Hard dependencies: this node runs only after all of these succeed.
    #[serde(default)]
    pub after: Vec<String>,

    /// Name the node's value is published under; defaults to the node id.
    #[serde(default)]
    pub output: Option<String>,
}

impl NodeConfig {
    pub fn output_name(&self, id: &str) -> String {
        self.output.clone().unwrap_or_else(|| id.to_string())
    }
}
