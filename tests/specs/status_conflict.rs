// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic-lock conflicts on status writes retry within a single
//! reconcile and do not affect its outcome.

use crate::support::{harness, key, wait_for};
use std::sync::Arc;
use std::time::Duration;
use steward_adapters::{
    FakeOrchestrator, FakeProvider, FakeRegistry, FakeStatusStore, StatusStore,
};
use steward_core::{McpServerSpec, ReconcileMetrics, ReconcileState, ResourceType};
use steward_engine::{ManagerConfig, ManagerDeps, McpServerReconciler, StatusSync};

#[tokio::test(start_paused = true)]
async fn conflicting_status_write_retries_and_succeeds() {
    let provider = FakeProvider::new();
    let orchestrator = FakeOrchestrator::new();
    let registry = FakeRegistry::new();
    let store = FakeStatusStore::new();
    let metrics = Arc::new(ReconcileMetrics::default());

    let deps = ManagerDeps { metrics: Arc::clone(&metrics), ..Default::default() };
    let h = harness(ManagerConfig::default(), deps);

    let sync = StatusSync::new(
        Some(Arc::new(store.clone()) as Arc<dyn StatusStore>),
        Arc::clone(&metrics),
        h.manager.failure_tracker(),
    );
    let reconciler = McpServerReconciler::new(
        Arc::new(provider.clone()),
        Arc::new(orchestrator.clone()),
        Arc::new(registry.clone()),
        sync,
    );
    h.manager.register_reconciler(Arc::new(reconciler)).unwrap();
    h.manager.start().await.unwrap();

    // A spec that needs no lifecycle action, so the only external effect
    // is the status write.
    let spec = McpServerSpec {
        name: "prom".to_string(),
        server_type: "stdio".to_string(),
        auto_start: false,
        ..Default::default()
    };
    provider.insert("default", "prom", spec);
    store.conflict_next(1);

    h.manager.trigger_reconcile(ResourceType::McpServer, None, "prom");

    let key = key(ResourceType::McpServer, "prom");
    assert!(
        wait_for(Duration::from_secs(10), || {
            h.manager.status(&key).is_some_and(|s| s.state == ReconcileState::Synced)
        })
        .await
    );

    // One conflict: exactly two gets and two updates in one reconcile.
    assert_eq!(store.get_calls(), 2);
    assert_eq!(store.update_calls(), 2);
    assert_eq!(metrics.status_sync_attempts(ResourceType::McpServer), 1);
    assert_eq!(metrics.status_sync_successes(ResourceType::McpServer), 1);
    assert!(orchestrator.calls().is_empty());

    h.manager.stop().await;
}
