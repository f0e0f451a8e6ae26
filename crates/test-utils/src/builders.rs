#![allow(dead_code)]

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use anyhow::bail;
use taskdag::config::{NodeConfig, PipelineFile, RawPipelineFile};
use taskdag::{ExecutorOptions, TaskNode};

/// Node whose body sleeps for `delay` and then returns `value`.
pub fn sleepy(id: &str, delay: Duration, value: &str) -> TaskNode<String> {
    let value = value.to_string();
    TaskNode::new(id, move |_| {
        thread::sleep(delay);
        Ok(value.clone())
    })
}

/// Node whose body always fails with `message`.
pub fn failing(id: &str, message: &str) -> TaskNode<String> {
    let message = message.to_string();
    TaskNode::new(id, move |_| -> anyhow::Result<String> { bail!("{message}") })
}

/// Node whose body concatenates its inputs as `name=value`, in input order,
/// separated by `;`.
pub fn echo_inputs(id: &str) -> TaskNode<String> {
    TaskNode::new(id, |inputs| {
        Ok(inputs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(";"))
    })
}

/// The four-node ensemble pipeline:
///
/// `pre_process` publishes `my_cool_df`; `model1` and `model2` each consume
/// it; `ensemble` joins both model values with `" and "`. Every body sleeps
/// for `delay` so independent nodes have measurable, overlapping windows.
pub fn ensemble_nodes(delay: Duration) -> Vec<TaskNode<String>> {
    let pre_process = TaskNode::new("pre_process", move |_| {
        thread::sleep(delay);
        Ok("features".to_string())
    })
    .with_output_name("my_cool_df");

    let model = |id: &'static str, label: &'static str| {
        TaskNode::new(id, move |inputs| {
            let df = inputs.require("my_cool_df")?;
            thread::sleep(delay);
            Ok(format!("{label} fit on {df}"))
        })
        .depends_on("pre_process")
    };

    let ensemble = TaskNode::new("ensemble", move |inputs| {
        let first = inputs.require("model1")?;
        let second = inputs.require("model2")?;
        thread::sleep(delay);
        Ok(format!("{first} and {second}"))
    })
    .depends_on_all(["model1", "model2"]);

    vec![
        pre_process,
        model("model1", "model 1"),
        model("model2", "model 2"),
        ensemble,
    ]
}

/// Builder for `PipelineFile` to simplify test setup.
pub struct PipelineBuilder {
    config: RawPipelineFile,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: RawPipelineFile {
                executor: ExecutorOptions::default(),
                node: BTreeMap::new(),
            },
        }
    }

    pub fn with_executor(mut self, options: ExecutorOptions) -> Self {
        self.config.executor = options;
        self
    }

    pub fn with_node(mut self, id: &str, node: NodeConfig) -> Self {
        self.config.node.insert(id.to_string(), node);
        self
    }

    pub fn build(self) -> PipelineFile {
        PipelineFile::try_from(self.config).expect("Failed to build valid pipeline from builder")
    }

    pub fn build_raw(self) -> RawPipelineFile {
        self.config
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `NodeConfig`.
pub struct NodeConfigBuilder {
    node: NodeConfig,
}

impl NodeConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            node: NodeConfig {
                cmd: cmd.to_string(),
                after: vec![],
                output: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.node.after.push(dep.to_string());
        self
    }

    pub fn output(mut self, name: &str) -> Self {
        self.node.output = Some(name.to_string());
        self
    }

    pub fn build(self) -> NodeConfig {
        self.node
    }
}
