// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Only structural and infrastructure problems surface as [`TaskDagError`].
//! A node body that fails (or panics) is *not* an error of the run: it is
//! captured into that node's result entry and the run carries on.

use thiserror::Error;

use crate::dag::NodeId;

#[derive(Error, Debug)]
pub enum TaskDagError {
    #[error("Duplicate node id: {0}")]
    DuplicateId(NodeId),

    #[error("Node '{node}' has unknown dependency '{dependency}'")]
    UnknownDependency { node: NodeId, dependency: NodeId },

    #[error("Cycle detected in dependency graph involving: {}", .0.join(", "))]
    CycleDetected(Vec<NodeId>),

    #[error("Output name '{output}' is published by both '{first}' and '{second}'")]
    DuplicateOutputName {
        output: String,
        first: NodeId,
        second: NodeId,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Executor '{0}' has already been executed")]
    AlreadyExecuted(String),

    #[error("Run stalled with nodes still pending: {}", .0.join(", "))]
    Stalled(Vec<NodeId>),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskDagError>;
