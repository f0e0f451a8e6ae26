// src/dag/mod.rs

//! Node model, dependency graph and scheduling.
//!
//! - [`node`] defines [`TaskNode`], its body type and the [`Inputs`] handed
//!   to a body.
//! - [`graph`] holds the validated, immutable [`DependencyGraph`].
//! - [`state`] defines per-node lifecycle states.
//! - [`scheduler`] contains the pure state machine that decides which nodes
//!   are dispatched, and which are skipped after a failure.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] applies the individual state transitions.

pub mod graph;
pub mod node;
pub mod scheduler;
pub mod scheduler_step;
pub mod state;
pub mod state_manager;

/// Canonical node identifier type used throughout the crate.
pub type NodeId = String;

pub use graph::DependencyGraph;
pub use node::{Inputs, TaskBody, TaskNode};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use state::{NodeOutcome, NodeState, SkippedNode};
