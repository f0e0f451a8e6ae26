// tests/execution_strategies.rs

use std::time::Duration;

use taskdag::{ExecutionStrategy, Executor, ExecutorOptions, NodeState, TaskDagError};
use taskdag_test_utils::builders::{echo_inputs, ensemble_nodes};
use taskdag_test_utils::recorder::InvocationLog;
use taskdag_test_utils::timeline::{assert_causal_order, peak_concurrency, windows_overlap};
use taskdag_test_utils::{init_tracing, with_timeout};

#[test]
fn debug_mode_runs_one_node_at_a_time_in_ready_order() {
    init_tracing();
    let log = InvocationLog::new();
    let nodes = vec![
        log.node("c"),
        log.node("a"),
        log.node("b").depends_on("a"),
        log.node("d").depends_on_all(["b", "c"]),
    ];
    let executor =
        Executor::new(nodes, ExecutorOptions::new("debug").max_concurrency(4).debug(true)).unwrap();
    assert_eq!(executor.options().strategy, ExecutionStrategy::Sequential);

    let report = executor.execute().unwrap();

    assert!(report.is_success());
    // a and c are ready first (ascending id); b is released by a.
    assert_eq!(log.ids(), vec!["a", "b", "c", "d"]);
    assert_eq!(peak_concurrency(&executor), 1);
    assert_causal_order(&executor);
}

#[test]
fn sequential_ensemble_matches_parallel_values() {
    let delay = Duration::from_millis(20);

    let parallel = Executor::new(ensemble_nodes(delay), ExecutorOptions::new("p").max_concurrency(3)).unwrap();
    let sequential = Executor::new(ensemble_nodes(delay), ExecutorOptions::new("s").debug(true)).unwrap();
    parallel.execute().unwrap();
    sequential.execute().unwrap();

    assert_eq!(parallel.output("ensemble"), sequential.output("ensemble"));
    assert!(!windows_overlap(&sequential, "model1", "model2"));
}

#[test]
fn concurrency_limit_is_never_exceeded() {
    init_tracing();
    let nodes = (0..8)
        .map(|i| taskdag_test_utils::builders::sleepy(&format!("n{i}"), Duration::from_millis(40), "x"))
        .collect();
    let executor = Executor::new(nodes, ExecutorOptions::new("limit").max_concurrency(2)).unwrap();

    executor.execute().unwrap();

    let peak = peak_concurrency(&executor);
    assert!(peak >= 1 && peak <= 2, "peak concurrency was {peak}");
}

#[test]
fn dependent_sees_only_its_own_dependencies() {
    let log = InvocationLog::new();
    let nodes = vec![
        log.node("a"),
        log.node("b"),
        log.node("unrelated"),
        echo_inputs("sink").depends_on_all(["a", "b"]),
    ];
    let executor = Executor::new(nodes, ExecutorOptions::new("isolation")).unwrap();
    executor.execute().unwrap();

    assert_eq!(
        executor.output("sink").as_deref(),
        Some("a=a-out;b=b-out")
    );
}

#[test]
fn second_execute_is_rejected() {
    let log = InvocationLog::new();
    let executor = Executor::new(vec![log.node("a")], ExecutorOptions::new("once")).unwrap();

    assert!(!executor.has_executed());
    executor.execute().unwrap();
    assert!(executor.has_executed());

    let err = executor.execute().unwrap_err();
    assert!(matches!(err, TaskDagError::AlreadyExecuted(ref name) if name == "once"));
    assert_eq!(log.count_of("a"), 1);
}

#[test]
fn empty_executor_succeeds_immediately() {
    let executor: Executor<String> = Executor::new(Vec::new(), ExecutorOptions::new("empty")).unwrap();
    let report = executor.execute().unwrap();
    assert!(report.is_success());
    assert!(report.succeeded.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn execute_async_runs_inside_an_existing_runtime() {
    init_tracing();
    let executor = Executor::new(
        ensemble_nodes(Duration::from_millis(50)),
        ExecutorOptions::new("async").max_concurrency(3),
    )
    .unwrap();

    let report = with_timeout(executor.execute_async()).await.unwrap();

    assert!(report.is_success());
    assert!(windows_overlap(&executor, "model1", "model2"));
    assert_causal_order(&executor);
}

#[tokio::test]
async fn execute_async_sequential_on_current_thread_runtime() {
    let log = InvocationLog::new();
    let nodes = vec![log.node("a"), log.node("b").depends_on("a")];
    let executor = Executor::new(nodes, ExecutorOptions::new("async-seq").debug(true)).unwrap();

    let report = with_timeout(executor.execute_async()).await.unwrap();

    assert!(report.is_success());
    assert_eq!(log.ids(), vec!["a", "b"]);
    assert_eq!(executor.result("b").unwrap().state, NodeState::Success);
    let b_inputs = &log.calls()[1].inputs;
    assert_eq!(b_inputs, &vec![("a".to_string(), "a-out".to_string())]);
}

#[tokio::test]
async fn blocking_execute_inside_a_runtime_completes() {
    init_tracing();
    let executor = Executor::new(
        ensemble_nodes(Duration::from_millis(20)),
        ExecutorOptions::new("nested").max_concurrency(3),
    )
    .unwrap();

    let report = executor.execute().unwrap();

    assert!(report.is_success());
    assert_eq!(report.succeeded.len(), 4);
    assert!(executor.output("ensemble").is_some());
    assert_causal_order(&executor);
}
