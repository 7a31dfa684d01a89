//! Integration tests for failure propagation and cancellation.

mod common;

use std::sync::Arc;

use common::{collect_events, record, target};
use meridian_deploy::{DeployError, EventKind, GraphExecutor, MockDeployer};
use meridian_model::DependencyGraph;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dependency_failure_cancels_the_dependent() {
    // a -> b, b's deploy fails.
    let records = vec![record("a").depends_on("b", false).build(), record("b").build()];
    let graph = Arc::new(DependencyGraph::build(&records).unwrap());
    let mock = Arc::new(MockDeployer::new());
    mock.fail_deploy_of(target("b"));
    let mut executor = GraphExecutor::new(graph, Arc::clone(&mock) as Arc<dyn meridian_deploy::Deployer>, 2).unwrap();

    let (events_tx, collector) = collect_events(64);
    let result = executor.run(Some(events_tx)).await;
    assert!(matches!(result, Err(DeployError::Failed { .. })));

    let stats = executor.stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.successful, 0);
    assert_eq!(stats.failed, 2);

    let events = collector.await.unwrap();
    let kinds_for = |name: &str| -> Vec<EventKind> {
        events
            .iter()
            .filter(|e| e.target.name == name)
            .map(|e| e.kind)
            .collect()
    };
    assert!(kinds_for("b").contains(&EventKind::DeploymentFailure));
    let a_kinds = kinds_for("a");
    assert!(a_kinds.contains(&EventKind::DependencyFailure));
    assert!(a_kinds.contains(&EventKind::DeploymentFailure));
    // a was canceled before touching the framework.
    assert!(!a_kinds.contains(&EventKind::DeploymentStarted));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn health_failure_splits_waiters() {
    // a waits for b to be healthy; c waits only for b's deploy.
    // b deploys fine but never becomes healthy.
    let records = vec![
        record("a").depends_on("b", true).build(),
        record("b").build(),
        record("c").depends_on("b", false).build(),
    ];
    let graph = Arc::new(DependencyGraph::build(&records).unwrap());
    let mock = Arc::new(MockDeployer::new());
    mock.fail_health_of(target("b"));
    let mut executor = GraphExecutor::new(graph, Arc::clone(&mock) as Arc<dyn meridian_deploy::Deployer>, 3).unwrap();

    let (events_tx, collector) = collect_events(64);
    let result = executor.run(Some(events_tx)).await;
    assert!(result.is_err());

    let stats = executor.stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.successful, 1);
    assert_eq!(stats.failed, 2);

    let events = collector.await.unwrap();
    let kinds_for = |name: &str| -> Vec<EventKind> {
        events
            .iter()
            .filter(|e| e.target.name == name)
            .map(|e| e.kind)
            .collect()
    };
    // c deployed despite b's health failure.
    assert!(kinds_for("c").contains(&EventKind::DeploymentSuccess));
    // a never started.
    let a_kinds = kinds_for("a");
    assert!(a_kinds.contains(&EventKind::DependencyFailure));
    assert!(!a_kinds.contains(&EventKind::DeploymentStarted));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancellation_propagates_through_chains() {
    // a -> b -> c, c fails; the whole chain is marked failed.
    let records = vec![
        record("a").depends_on("b", false).build(),
        record("b").depends_on("c", false).build(),
        record("c").build(),
    ];
    let graph = Arc::new(DependencyGraph::build(&records).unwrap());
    let mock = Arc::new(MockDeployer::new());
    mock.fail_deploy_of(target("c"));
    let mut executor = GraphExecutor::new(graph, Arc::clone(&mock) as Arc<dyn meridian_deploy::Deployer>, 3).unwrap();

    let result = executor.run(None).await;
    assert!(result.is_err());

    let stats = executor.stats();
    assert_eq!(stats.successful, 0);
    assert_eq!(stats.failed, 3);
}

#[tokio::test]
async fn first_error_is_retained() {
    let records = vec![record("a").build(), record("b").build()];
    let graph = Arc::new(DependencyGraph::build(&records).unwrap());
    let mock = Arc::new(MockDeployer::new());
    mock.fail_deploy_of(target("a"));
    mock.fail_deploy_of(target("b"));
    // One worker, so failures are reported in deploy order. With no edges
    // the deploy order is the reverse of record order, so b goes first.
    let mut executor = GraphExecutor::new(graph, Arc::clone(&mock) as Arc<dyn meridian_deploy::Deployer>, 1).unwrap();

    let error = executor.run(None).await.unwrap_err();
    match error {
        DeployError::Failed { target, .. } => assert_eq!(target.name, "b"),
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(executor.stats().failed, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn phase_panic_is_reraised_after_the_pool_drains() {
    let records = vec![
        record("a").depends_on("boom", false).build(),
        record("boom").build(),
    ];
    let graph = Arc::new(DependencyGraph::build(&records).unwrap());
    let deployer = Arc::new(common::PanickingDeployer {
        panic_on: target("boom"),
    });
    let mut executor = GraphExecutor::new(graph, deployer as Arc<dyn meridian_deploy::Deployer>, 2).unwrap();

    // The run re-raises the worker's panic; observe it as a task panic
    // rather than letting it take down the test harness thread.
    let run = tokio::spawn(async move { executor.run(None).await });
    let join = run.await;
    assert!(join.is_err());
    assert!(join.unwrap_err().is_panic());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failure_error_chain_names_the_dependency() {
    let records = vec![record("a").depends_on("b", true).build(), record("b").build()];
    let graph = Arc::new(DependencyGraph::build(&records).unwrap());
    let mock = Arc::new(MockDeployer::new());
    mock.fail_health_of(target("b"));
    let mut executor = GraphExecutor::new(graph, Arc::clone(&mock) as Arc<dyn meridian_deploy::Deployer>, 1).unwrap();

    let error = executor.run(None).await.unwrap_err();
    // With one worker, b is processed first and is the first failure.
    let DeployError::Failed { target: failed, source } = error else {
        panic!("expected Failed");
    };
    assert_eq!(failed.name, "b");
    assert!(matches!(*source, DeployError::Health { .. }));
}
