// src/exec/command.rs

//! Shell commands as node bodies.
//!
//! Each command runs through the platform shell (`sh -c`, or `cmd /C` on
//! Windows). The values of the node's dependencies are passed in as
//! environment variables, one per input:
//!
//! - `TASKDAG_INPUT_<OUTPUT>`: the dependency's value, where `<OUTPUT>` is
//!   its output name upper-cased with non-alphanumerics replaced by `_`.
//! - `TASKDAG_NODE`: the id of the node being run.
//!
//! The node's value is the trimmed stdout of the command. A non-zero exit
//! status fails the node, carrying the exit code and stderr.

use std::process::{Command, Stdio};
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{debug, info};

use crate::config::model::PipelineFile;
use crate::dag::{Inputs, TaskBody, TaskNode};

/// Environment variable carrying the id of the running node.
pub const NODE_ENV_VAR: &str = "TASKDAG_NODE";

const INPUT_ENV_PREFIX: &str = "TASKDAG_INPUT_";

/// Name of the environment variable an input is exposed under.
///
/// `my_cool_df` becomes `TASKDAG_INPUT_MY_COOL_DF`.
pub fn input_env_var(output_name: &str) -> String {
    let suffix: String = output_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{INPUT_ENV_PREFIX}{suffix}")
}

/// Build a node body that runs `cmd` through the shell.
pub fn command_body(node_id: impl Into<String>, cmd: impl Into<String>) -> TaskBody<String> {
    let node_id = node_id.into();
    let cmd = cmd.into();
    Arc::new(move |inputs: &Inputs<String>| run_command(&node_id, &cmd, inputs))
}

/// Run a command to completion and return its trimmed stdout.
pub fn run_command(node_id: &str, cmd: &str, inputs: &Inputs<String>) -> anyhow::Result<String> {
    info!(node = %node_id, cmd = %cmd, "starting node process");

    // Build a shell command appropriate for the platform.
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .env(NODE_ENV_VAR, node_id)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (name, value) in inputs.iter() {
        command.env(input_env_var(name), value);
    }

    let output = command
        .output()
        .with_context(|| format!("spawning process for node '{node_id}'"))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines() {
        debug!(node = %node_id, "stderr: {}", line);
    }

    let code = output.status.code().unwrap_or(-1);
    info!(
        node = %node_id,
        exit_code = code,
        success = output.status.success(),
        "node process exited"
    );

    if !output.status.success() {
        bail!(
            "command `{}` exited with code {}: {}",
            cmd,
            code,
            stderr.trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Turn every `[node.<id>]` of a validated pipeline into a [`TaskNode`].
pub fn pipeline_nodes(pipeline: &PipelineFile) -> Vec<TaskNode<String>> {
    pipeline
        .node
        .iter()
        .map(|(id, node)| {
            TaskNode::from_body(id.clone(), command_body(id.clone(), node.cmd.clone()))
                .depends_on_all(node.after.iter().cloned())
                .with_output_name(node.output_name(id))
        })
        .collect()
}
