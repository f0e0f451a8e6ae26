// src/config/mod.rs

//! Configuration for the executor and for pipelines loaded from TOML.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a pipeline file from disk (`loader.rs`).
//! - Validate basic invariants like graph correctness (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ExecutorOptions, NodeConfig, PipelineFile, RawPipelineFile};
