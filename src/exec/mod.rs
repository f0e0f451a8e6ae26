// src/exec/mod.rs

//! Node execution layer.
//!
//! - [`worker`] runs one node body, captures failures and panics, and
//!   records telemetry and outputs.
//! - [`backend`] provides the `WorkerBackend` trait and the
//!   `BlockingPoolBackend` the parallel runtime uses in production.
//! - [`command`] turns shell commands into node bodies, for pipelines
//!   loaded from a config file.

pub mod backend;
pub mod command;
pub mod worker;

pub use backend::{BlockingPoolBackend, WorkerBackend};
pub use worker::{run_node, NodeCompletion, NodeJob};
