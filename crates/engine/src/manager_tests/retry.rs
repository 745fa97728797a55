// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry policy: exponential backoff, terminal failure, timeouts.

use super::*;

#[tokio::test(start_paused = true)]
async fn transient_failures_recover_with_backoff() {
    let t = default_manager();
    let stub = StubReconciler::with_script(
        ResourceType::McpServer,
        vec![
            Err(ReconcileError::External("conn refused".to_string())),
            Err(ReconcileError::External("conn refused".to_string())),
            Ok(ReconcileResult::done()),
        ],
    );
    t.manager.register_reconciler(stub.clone()).unwrap();
    t.manager.start().await.unwrap();

    let started = tokio::time::Instant::now();
    t.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");

    let key = key(ResourceType::McpServer, "prom");
    wait_until(|| stub.call_count() == 1).await;
    wait_until(|| {
        t.manager.status(&key).is_some_and(|s| s.state == ReconcileState::Error)
    })
    .await;
    assert_eq!(t.manager.status(&key).unwrap().retry_count, 1);

    wait_until(|| stub.call_count() == 3).await;
    wait_until(|| {
        t.manager.status(&key).is_some_and(|s| s.state == ReconcileState::Synced)
    })
    .await;

    // Attempts carried 1, 2, 3 and the delays summed to at least
    // 1s + 2s of backoff.
    let attempts: Vec<u32> = stub.calls().iter().map(|r| r.attempt).collect();
    assert_eq!(attempts, vec![1, 2, 3]);
    assert!(started.elapsed() >= Duration::from_secs(3));

    let status = t.manager.status(&key).unwrap();
    assert_eq!(status.retry_count, 0);
    assert_eq!(status.last_error, None);

    let metrics = t.manager.metrics();
    assert_eq!(metrics.reconcile_failures(ResourceType::McpServer), 2);
    assert_eq!(metrics.retries(ResourceType::McpServer), 2);
    assert_eq!(metrics.reconcile_successes(ResourceType::McpServer), 1);

    t.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn retries_carry_the_previous_error() {
    let t = default_manager();
    let stub = StubReconciler::with_script(
        ResourceType::McpServer,
        vec![Err(ReconcileError::External("first failure".to_string()))],
    );
    t.manager.register_reconciler(stub.clone()).unwrap();
    t.manager.start().await.unwrap();

    t.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");
    wait_until(|| stub.call_count() == 2).await;

    let retry = &stub.calls()[1];
    assert_eq!(retry.attempt, 2);
    assert_eq!(retry.last_error.as_deref(), Some("first failure"));

    t.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_mark_the_resource_failed() {
    let t = build(ManagerConfig { max_retries: 3, ..Default::default() });
    let stub =
        StubReconciler::failing(ResourceType::McpServer, "open /etc/steward/creds/token: denied");
    t.manager.register_reconciler(stub.clone()).unwrap();
    t.manager.start().await.unwrap();

    t.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");

    let key = key(ResourceType::McpServer, "prom");
    wait_until(|| {
        t.manager.status(&key).is_some_and(|s| s.state == ReconcileState::Failed)
    })
    .await;

    assert_eq!(stub.call_count(), 3);
    let status = t.manager.status(&key).unwrap();
    assert_eq!(status.retry_count, 3);
    // Terminal errors surface sanitized.
    assert_eq!(status.last_error.as_deref(), Some("open [path]/token: denied"));

    // Failed is terminal: nothing further happens without a new event.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(stub.call_count(), 3);
    assert_eq!(t.manager.status(&key).unwrap().state, ReconcileState::Failed);
    assert_eq!(t.manager.metrics().terminal_failures(ResourceType::McpServer), 1);

    // A new event restarts the cycle from Pending.
    t.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");
    wait_until(|| stub.call_count() > 3).await;

    t.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn slow_reconcilers_time_out_and_retry() {
    let t = build(ManagerConfig {
        max_retries: 2,
        reconcile_timeout: Duration::from_millis(50),
        ..Default::default()
    });
    let stub = StubReconciler::ok(ResourceType::McpServer);
    stub.set_delay(Duration::from_millis(500));
    t.manager.register_reconciler(stub.clone()).unwrap();
    t.manager.start().await.unwrap();

    t.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");

    let key = key(ResourceType::McpServer, "prom");
    wait_until(|| {
        t.manager.status(&key).is_some_and(|s| s.state == ReconcileState::Failed)
    })
    .await;

    let status = t.manager.status(&key).unwrap();
    assert!(status.last_error.as_deref().unwrap_or_default().contains("timed out"));
    assert!(t.manager.metrics().reconcile_timeouts(ResourceType::McpServer) >= 1);

    t.manager.stop().await;
}
