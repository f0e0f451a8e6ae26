// src/engine/report.rs

//! Run-level summary.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::dag::{NodeId, NodeState};
use crate::store::ResultEntry;

/// Overall outcome of a run: `Success` only if every node succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Success => f.write_str("success"),
            RunOutcome::Failed => f.write_str("failed"),
        }
    }
}

/// What `execute()` returns once every node is terminal.
///
/// Id lists are sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub name: String,
    pub outcome: RunOutcome,
    pub succeeded: Vec<NodeId>,
    pub failed: Vec<NodeId>,
    pub skipped: Vec<NodeId>,
    pub elapsed: Duration,
}

impl RunReport {
    pub(crate) fn from_entries<T>(
        name: &str,
        entries: &BTreeMap<NodeId, ResultEntry<T>>,
        elapsed: Duration,
    ) -> Self {
        let ids_in = |state: NodeState| -> Vec<NodeId> {
            entries
                .iter()
                .filter(|(_, e)| e.state == state)
                .map(|(id, _)| id.clone())
                .collect()
        };

        let succeeded = ids_in(NodeState::Success);
        let failed = ids_in(NodeState::Failed);
        let skipped = ids_in(NodeState::Skipped);

        let outcome = if succeeded.len() == entries.len() {
            RunOutcome::Success
        } else {
            RunOutcome::Failed
        };

        Self {
            name: name.to_string(),
            outcome,
            succeeded,
            failed,
            skipped,
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Success
    }

    /// Failed and skipped ids together, sorted.
    pub fn non_succeeding(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .failed
            .iter()
            .chain(self.skipped.iter())
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({} succeeded, {} failed, {} skipped) in {:.2?}",
            self.name,
            self.outcome,
            self.succeeded.len(),
            self.failed.len(),
            self.skipped.len(),
            self.elapsed
        )?;
        if !self.failed.is_empty() {
            write!(f, "; failed: {}", self.failed.join(", "))?;
        }
        if !self.skipped.is_empty() {
            write!(f, "; skipped: {}", self.skipped.join(", "))?;
        }
        Ok(())
    }
}
