// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manager lifecycle: registration, start, idempotent stop.

use super::*;

#[tokio::test(start_paused = true)]
async fn duplicate_registration_is_rejected() {
    let t = default_manager();
    t.manager.register_reconciler(StubReconciler::ok(ResourceType::McpServer)).unwrap();

    let err = t
        .manager
        .register_reconciler(StubReconciler::ok(ResourceType::McpServer))
        .unwrap_err();
    assert!(matches!(err, EngineError::ReconcilerExists(ResourceType::McpServer)));
}

#[tokio::test(start_paused = true)]
async fn start_twice_is_an_error() {
    let t = default_manager();
    t.manager.register_reconciler(StubReconciler::ok(ResourceType::McpServer)).unwrap();
    t.manager.start().await.unwrap();

    assert!(matches!(t.manager.start().await, Err(EngineError::AlreadyRunning)));

    t.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_terminates_workers_and_is_idempotent() {
    let t = default_manager();
    t.manager.register_reconciler(StubReconciler::ok(ResourceType::McpServer)).unwrap();
    t.manager.start().await.unwrap();

    // stop() waits for the event loop and every worker; a hang here
    // would trip the harness timeout.
    tokio::time::timeout(Duration::from_secs(5), t.manager.stop())
        .await
        .expect("stop must not hang");
    t.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_while_reconciling_completes() {
    let t = default_manager();
    let stub = StubReconciler::ok(ResourceType::McpServer);
    stub.set_delay(Duration::from_millis(50));
    t.manager.register_reconciler(stub.clone()).unwrap();
    t.manager.start().await.unwrap();

    t.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");
    wait_until(|| stub.call_count() == 1).await;

    tokio::time::timeout(Duration::from_secs(5), t.manager.stop())
        .await
        .expect("stop must not hang");
}

#[tokio::test(start_paused = true)]
async fn events_after_stop_are_ignored() {
    let t = default_manager();
    let stub = StubReconciler::ok(ResourceType::McpServer);
    t.manager.register_reconciler(stub.clone()).unwrap();
    t.manager.start().await.unwrap();
    t.manager.stop().await;

    t.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn registration_while_running_starts_watching_the_type() {
    let t = default_manager();
    t.manager.register_reconciler(StubReconciler::ok(ResourceType::McpServer)).unwrap();
    t.manager.start().await.unwrap();

    // Late registration must extend the live detector.
    let stub = StubReconciler::ok(ResourceType::Workflow);
    t.manager.register_reconciler(stub.clone()).unwrap();
    t.manager.trigger_reconcile(ResourceType::Workflow, None, "wf");
    wait_until(|| stub.call_count() == 1).await;

    t.manager.stop().await;
}
