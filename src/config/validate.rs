// src/config/validate.rs

use std::collections::BTreeSet;

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::dag::node::ensure_unique_output_names;
use crate::dag::DependencyGraph;
use crate::errors::{Result, TaskDagError};

impl TryFrom<RawPipelineFile> for PipelineFile {
    type Error = TaskDagError;

    fn try_from(raw: RawPipelineFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(PipelineFile::new_unchecked(raw.executor, raw.node))
    }
}

fn validate_raw_config(cfg: &RawPipelineFile) -> Result<()> {
    ensure_has_nodes(cfg)?;
    cfg.executor.validate()?;
    validate_commands(cfg)?;
    validate_graph(cfg)?;
    validate_outputs(cfg)?;
    Ok(())
}

fn ensure_has_nodes(cfg: &RawPipelineFile) -> Result<()> {
    if cfg.node.is_empty() {
        return Err(TaskDagError::ConfigError(
            "pipeline must contain at least one [node.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_commands(cfg: &RawPipelineFile) -> Result<()> {
    for (id, node) in cfg.node.iter() {
        if node.cmd.trim().is_empty() {
            return Err(TaskDagError::ConfigError(format!(
                "node '{}' has an empty `cmd`",
                id
            )));
        }
    }
    Ok(())
}

/// Unknown `after` references and cycles are reported by the graph builder
/// itself, with the same errors an in-code executor would get.
fn validate_graph(cfg: &RawPipelineFile) -> Result<()> {
    DependencyGraph::from_declarations(cfg.node.iter().map(|(id, node)| {
        (
            id.clone(),
            node.after.iter().cloned().collect::<BTreeSet<_>>(),
        )
    }))?;
    Ok(())
}

fn validate_outputs(cfg: &RawPipelineFile) -> Result<()> {
    let outputs: Vec<(&str, String)> = cfg
        .node
        .iter()
        .map(|(id, node)| (id.as_str(), node.output_name(id)))
        .collect();

    ensure_unique_output_names(outputs.iter().map(|(id, out)| (*id, out.as_str())))
}
