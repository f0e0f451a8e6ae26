use std::time::Instant;

use taskdag::{Executor, NodeState};

/// `[initial_time, final_time]` of a finished node.
pub fn window<T: Clone>(executor: &Executor<T>, id: &str) -> (Instant, Instant) {
    let entry = executor
        .result(id)
        .unwrap_or_else(|| panic!("no result entry for '{id}'"));
    match (entry.initial_time, entry.final_time) {
        (Some(start), Some(end)) => (start, end),
        _ => panic!("'{id}' has no complete window (state {})", entry.state),
    }
}

/// Whether two finished nodes were running at the same time.
pub fn windows_overlap<T: Clone>(executor: &Executor<T>, a: &str, b: &str) -> bool {
    let (a_start, a_end) = window(executor, a);
    let (b_start, b_end) = window(executor, b);
    a_start < b_end && b_start < a_end
}

/// For every edge whose dependent ran, the dependency finished no later than
/// the dependent started.
pub fn assert_causal_order<T: Clone>(executor: &Executor<T>) {
    for (dep, dependent) in executor.graph_view().edges() {
        let Some(entry) = executor.result(&dependent) else {
            panic!("no result entry for '{dependent}'");
        };
        let Some(started) = entry.initial_time else {
            continue;
        };
        let (_, dep_end) = window(executor, &dep);
        assert!(
            dep_end <= started,
            "'{dependent}' started before its dependency '{dep}' finished"
        );
    }
}

/// Every node ended in a terminal state.
pub fn assert_all_terminal<T: Clone>(executor: &Executor<T>) {
    for (id, entry) in executor.results() {
        assert!(
            entry.state.is_terminal(),
            "'{id}' ended in non-terminal state {}",
            entry.state
        );
    }
}

/// Ids in the given state, ascending.
pub fn ids_in<T: Clone>(executor: &Executor<T>, state: NodeState) -> Vec<String> {
    executor
        .results()
        .into_iter()
        .filter(|(_, e)| e.state == state)
        .map(|(id, _)| id)
        .collect()
}

/// Peak number of nodes whose windows overlap at a single instant.
pub fn peak_concurrency<T: Clone>(executor: &Executor<T>) -> usize {
    let mut events: Vec<(Instant, i32)> = Vec::new();
    for entry in executor.results().values() {
        if let (Some(start), Some(end)) = (entry.initial_time, entry.final_time) {
            events.push((start, 1));
            events.push((end, -1));
        }
    }
    // Ends sort before starts at the same instant.
    events.sort();

    let mut current = 0i32;
    let mut peak = 0i32;
    for (_, delta) in events {
        current += delta;
        peak = peak.max(current);
    }
    peak as usize
}
