// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event routing: triggers, disabled types, per-identity serialization,
//! voluntary requeue and the orchestrator bridge.

use super::*;
use steward_adapters::{FakeOrchestrator, ServiceStateChange};
use steward_core::HealthState;

#[tokio::test(start_paused = true)]
async fn trigger_runs_the_registered_reconciler() {
    let t = default_manager();
    let stub = StubReconciler::ok(ResourceType::McpServer);
    t.manager.register_reconciler(stub.clone()).unwrap();
    t.manager.start().await.unwrap();

    t.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");

    let key = key(ResourceType::McpServer, "prom");
    wait_until(|| {
        t.manager.status(&key).is_some_and(|s| s.state == ReconcileState::Synced)
    })
    .await;

    assert_eq!(stub.call_count(), 1);
    let calls = stub.calls();
    assert_eq!(calls[0].name, "prom");
    assert_eq!(calls[0].namespace, "default");
    assert_eq!(calls[0].attempt, 1);

    let metrics = t.manager.metrics();
    assert_eq!(metrics.events_received(ResourceType::McpServer), 1);
    assert_eq!(metrics.reconcile_successes(ResourceType::McpServer), 1);

    t.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn unregistered_types_are_dropped() {
    let t = default_manager();
    t.manager.register_reconciler(StubReconciler::ok(ResourceType::McpServer)).unwrap();
    t.manager.start().await.unwrap();

    t.manager.trigger_reconcile(ResourceType::Workflow, None, "wf1");

    assert_eq!(t.manager.queue_len(), 0);
    assert!(t.manager.status(&key(ResourceType::Workflow, "wf1")).is_none());
    assert_eq!(t.manager.metrics().events_dropped(ResourceType::Workflow), 1);

    t.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn disabled_types_never_reach_the_queue() {
    let t = default_manager();
    let stub = StubReconciler::ok(ResourceType::Workflow);
    t.manager.register_reconciler(stub.clone()).unwrap();
    t.manager.start().await.unwrap();

    t.manager.disable_resource_type(ResourceType::Workflow);
    t.manager.trigger_reconcile(ResourceType::Workflow, None, "wf1");

    // Zero enqueues, zero reconciler invocations, no status entry.
    assert_eq!(t.manager.queue_len(), 0);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(stub.call_count(), 0);
    assert!(t.manager.status(&key(ResourceType::Workflow, "wf1")).is_none());

    // Re-enabling lets events flow again.
    t.manager.enable_resource_type(ResourceType::Workflow);
    t.manager.trigger_reconcile(ResourceType::Workflow, None, "wf1");
    wait_until(|| stub.call_count() == 1).await;

    t.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn enabled_set_is_registered_minus_disabled() {
    let t = default_manager();
    t.manager.register_reconciler(StubReconciler::ok(ResourceType::McpServer)).unwrap();
    t.manager.register_reconciler(StubReconciler::ok(ResourceType::Workflow)).unwrap();

    assert!(t.manager.is_resource_type_enabled(ResourceType::McpServer));
    // Registered is a precondition: ServiceClass has no reconciler.
    assert!(!t.manager.is_resource_type_enabled(ResourceType::ServiceClass));

    t.manager.disable_resource_type(ResourceType::Workflow);
    assert!(!t.manager.is_resource_type_enabled(ResourceType::Workflow));
    assert_eq!(t.manager.enabled_resource_types(), vec![ResourceType::McpServer]);

    t.manager.enable_resource_type(ResourceType::Workflow);
    assert_eq!(
        t.manager.enabled_resource_types(),
        vec![ResourceType::McpServer, ResourceType::Workflow]
    );
}

#[tokio::test(start_paused = true)]
async fn same_identity_never_reconciles_concurrently() {
    let t = default_manager();
    let stub = StubReconciler::ok(ResourceType::McpServer);
    stub.set_delay(Duration::from_millis(50));
    t.manager.register_reconciler(stub.clone()).unwrap();
    t.manager.start().await.unwrap();

    // Further triggers land while the first is mid-reconcile.
    t.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");
    wait_until(|| stub.call_count() == 1).await;
    t.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");
    t.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");

    // The in-flight run finishes, then the superseding event runs once.
    wait_until(|| stub.call_count() == 2).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(stub.call_count(), 2);
    assert_eq!(stub.max_in_flight(), 1);

    t.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn distinct_identities_run_on_parallel_workers() {
    let t = default_manager();
    let stub = StubReconciler::ok(ResourceType::McpServer);
    stub.set_delay(Duration::from_millis(50));
    t.manager.register_reconciler(stub.clone()).unwrap();
    t.manager.start().await.unwrap();

    t.manager.trigger_reconcile(ResourceType::McpServer, None, "a");
    t.manager.trigger_reconcile(ResourceType::McpServer, None, "b");

    wait_until(|| stub.call_count() == 2).await;
    wait_until(|| {
        let statuses = t.manager.statuses();
        statuses.values().filter(|s| s.state == ReconcileState::Synced).count() == 2
    })
    .await;
    // Two workers picked up the two identities concurrently.
    assert_eq!(stub.max_in_flight(), 2);

    t.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn voluntary_requeue_after_runs_again() {
    let t = default_manager();
    let stub = StubReconciler::with_script(
        ResourceType::McpServer,
        vec![Ok(ReconcileResult::requeue_after(Duration::from_millis(100)))],
    );
    t.manager.register_reconciler(stub.clone()).unwrap();
    t.manager.start().await.unwrap();

    t.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");

    let key = key(ResourceType::McpServer, "prom");
    wait_until(|| stub.call_count() == 1).await;
    // Synced immediately, not pending on the delayed requeue.
    wait_until(|| {
        t.manager.status(&key).is_some_and(|s| s.state == ReconcileState::Synced)
    })
    .await;

    wait_until(|| stub.call_count() == 2).await;
    // The voluntary requeue is not a retry: the attempt counter stays 1.
    assert_eq!(stub.calls()[1].attempt, 1);

    t.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn orchestrator_state_changes_flow_through_the_bridge() {
    let orchestrator = FakeOrchestrator::new();
    let deps = ManagerDeps {
        orchestrator: Some(Arc::new(orchestrator.clone())),
        ..Default::default()
    };
    let t = build_with_deps(ManagerConfig::default(), deps);
    let stub = StubReconciler::ok(ResourceType::McpServer);
    t.manager.register_reconciler(stub.clone()).unwrap();
    t.manager.start().await.unwrap();

    orchestrator.emit_state_change(ServiceStateChange {
        name: "prom".to_string(),
        service_type: "MCPServer".to_string(),
        old_state: "running".to_string(),
        new_state: "failed".to_string(),
        health: HealthState::Unhealthy,
    });

    wait_until(|| stub.call_count() == 1).await;
    assert_eq!(stub.calls()[0].name, "prom");

    // Unmapped service types are ignored by the bridge.
    orchestrator.emit_state_change(ServiceStateChange {
        name: "other".to_string(),
        service_type: "Workflow".to_string(),
        old_state: "a".to_string(),
        new_state: "b".to_string(),
        health: HealthState::Unknown,
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(stub.call_count(), 1);

    t.manager.stop().await;
}
