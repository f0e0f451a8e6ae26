// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the [`Executor`], which owns the node registry, the graph and the
//!   result stores, and is what callers build and run
//! - the parallel [`Runtime`], an async shell that feeds worker completions
//!   into the pure [`Scheduler`](crate::dag::Scheduler)
//! - the sequential driver used by the debug strategy
//! - the [`RunReport`] summarising a finished run

pub mod executor;
pub mod report;
pub mod runtime;

pub use executor::{Executor, RegistryEntry};
pub use report::{RunOutcome, RunReport};
pub use runtime::{run_sequential, RunContext, Runtime};
