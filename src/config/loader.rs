// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::Result;

/// Load a pipeline file from a given path and return the raw `RawPipelineFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (graph correctness, etc.). Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawPipelineFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a pipeline file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - an empty pipeline or empty commands,
///   - `max_concurrency = 0`,
///   - unknown `after` references and dependency cycles,
///   - two nodes publishing under the same output name.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineFile> {
    let raw_config = load_from_path(&path)?;
    let config = PipelineFile::try_from(raw_config)?;
    Ok(config)
}
