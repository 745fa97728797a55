// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transient failures recover through backoff; persistent failures end
//! in a terminal Failed state.

use crate::support::{harness, key, wait_for, ScriptedReconciler};
use std::time::Duration;
use steward_core::{ReconcileError, ReconcileResult, ReconcileState, ResourceType};
use steward_engine::{ManagerConfig, ManagerDeps};

#[tokio::test(start_paused = true)]
async fn transient_failure_recovers() {
    let h = harness(ManagerConfig::default(), ManagerDeps::default());
    let reconciler = ScriptedReconciler::new(
        ResourceType::McpServer,
        vec![
            Err(ReconcileError::External("conn refused".to_string())),
            Err(ReconcileError::External("conn refused".to_string())),
        ],
        Ok(ReconcileResult::done()),
    );
    h.manager.register_reconciler(reconciler.clone()).unwrap();
    h.manager.start().await.unwrap();

    let started = tokio::time::Instant::now();
    h.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");

    let key = key(ResourceType::McpServer, "prom");
    // The first failure parks the resource in Error with one retry.
    assert!(
        wait_for(Duration::from_secs(10), || {
            h.manager.status(&key).is_some_and(|s| s.state == ReconcileState::Error)
        })
        .await
    );

    // Third attempt succeeds.
    assert!(wait_for(Duration::from_secs(10), || reconciler.call_count() == 3).await);
    assert!(
        wait_for(Duration::from_secs(10), || {
            h.manager.status(&key).is_some_and(|s| s.state == ReconcileState::Synced)
        })
        .await
    );

    // Backoffs: attempt 1→2 after ~1s, 2→3 after ~2s.
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert!(started.elapsed() < Duration::from_secs(10));

    let attempts: Vec<u32> = reconciler.calls().iter().map(|r| r.attempt).collect();
    assert_eq!(attempts, vec![1, 2, 3]);

    let status = h.manager.status(&key).unwrap();
    assert_eq!(status.retry_count, 0);
    assert_eq!(status.last_error, None);

    h.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn permanent_failure_is_terminal() {
    let config = ManagerConfig { max_retries: 3, ..Default::default() };
    let h = harness(config, ManagerDeps::default());
    let reconciler = ScriptedReconciler::new(
        ResourceType::McpServer,
        Vec::new(),
        Err(ReconcileError::External(
            "post /var/run/steward/api: bearer abc123 rejected".to_string(),
        )),
    );
    h.manager.register_reconciler(reconciler.clone()).unwrap();
    h.manager.start().await.unwrap();

    h.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");

    let key = key(ResourceType::McpServer, "prom");
    assert!(
        wait_for(Duration::from_secs(30), || {
            h.manager.status(&key).is_some_and(|s| s.state == ReconcileState::Failed)
        })
        .await
    );
    assert_eq!(reconciler.call_count(), 3);

    // The terminal error is sanitized before it is surfaced.
    let status = h.manager.status(&key).unwrap();
    let last_error = status.last_error.unwrap();
    assert!(!last_error.contains("abc123"), "secret leaked: {last_error}");
    assert!(!last_error.contains("/var/run/"), "path leaked: {last_error}");

    // No further requeue even well past the next backoff window.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(reconciler.call_count(), 3);
    assert_eq!(h.manager.status(&key).unwrap().state, ReconcileState::Failed);

    h.manager.stop().await;
}
