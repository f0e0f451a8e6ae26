use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How node bodies are executed.
///
/// - `Parallel`: bodies run on a pool of blocking worker threads, up to
///   `max_concurrency` at a time (default).
/// - `Sequential`: bodies run one at a time on the calling thread, in
///   ready-set order. Handy when debugging a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    Parallel,
    Sequential,
}

impl Default for ExecutionStrategy {
    fn default() -> Self {
        ExecutionStrategy::Parallel
    }
}

impl FromStr for ExecutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "parallel" => Ok(ExecutionStrategy::Parallel),
            "sequential" => Ok(ExecutionStrategy::Sequential),
            other => Err(format!(
                "invalid strategy: {other} (expected \"parallel\" or \"sequential\")"
            )),
        }
    }
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStrategy::Parallel => f.write_str("parallel"),
            ExecutionStrategy::Sequential => f.write_str("sequential"),
        }
    }
}

/// What happens to the rest of the run when a node fails.
///
/// - `Continue`: only the failed node's transitive dependents are skipped;
///   unrelated branches run to completion (default).
/// - `Abort`: nothing new is dispatched after the first failure. Nodes that
///   are already running finish, everything still pending is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    Continue,
    Abort,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Continue
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(format!(
                "invalid failure_policy: {other} (expected \"continue\" or \"abort\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" Sequential ".parse::<ExecutionStrategy>(), Ok(ExecutionStrategy::Sequential));
        assert_eq!("ABORT".parse::<FailurePolicy>(), Ok(FailurePolicy::Abort));
        assert!("eventually".parse::<ExecutionStrategy>().is_err());
        assert!("retry".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn defaults_are_parallel_and_continue() {
        assert_eq!(ExecutionStrategy::default(), ExecutionStrategy::Parallel);
        assert_eq!(FailurePolicy::default(), FailurePolicy::Continue);
        assert_eq!(ExecutionStrategy::Sequential.to_string(), "sequential");
    }
}
