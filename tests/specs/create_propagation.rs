// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A definition file appearing on disk propagates to a running service
//! and an externalized status.

use crate::support::{harness, key, wait_for};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use steward_adapters::{
    service_info_for, FakeOrchestrator, FakeProvider, FakeRegistry, FakeStatusStore, StatusStore,
};
use steward_core::{McpServerSpec, ReconcileMetrics, ReconcileState, ResourceType};
use steward_engine::{FailureTracker, ManagerConfig, ManagerDeps, McpServerReconciler, StatusSync};

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn filesystem_create_starts_the_service() {
    let provider = FakeProvider::new();
    let orchestrator = FakeOrchestrator::new();
    let registry = FakeRegistry::new();
    let store = FakeStatusStore::new();
    let metrics = Arc::new(ReconcileMetrics::default());

    let deps = ManagerDeps {
        orchestrator: Some(Arc::new(orchestrator.clone())),
        metrics: Arc::clone(&metrics),
        failures: Arc::new(FailureTracker::new()),
    };
    let h = harness(
        ManagerConfig { debounce_interval: Duration::from_millis(100), ..Default::default() },
        deps,
    );

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
    )
    .with_refresh_interval(Duration::from_millis(500));
    h.manager.register_reconciler(Arc::new(reconciler)).unwrap();
    h.manager.start().await.unwrap();

    // Desired state comes from the provider; the file event names it.
    let spec = McpServerSpec {
        name: "prom".to_string(),
        server_type: "stdio".to_string(),
        command: Some("/bin/p".to_string()),
        auto_start: true,
        ..Default::default()
    };
    provider.insert("default", "prom", spec.clone());
    std::fs::write(
        h.base.path().join("mcpservers/prom.yaml"),
        "name: prom\ntype: stdio\ncommand: /bin/p\nautoStart: true\n",
    )
    .unwrap();

    // Within a couple of debounce windows the worker starts the service.
    assert!(
        wait_for(Duration::from_secs(5), || orchestrator.call_count("start:prom") == 1).await,
        "service was never started"
    );
    assert!(
        wait_for(Duration::from_secs(5), || {
            h.manager
                .status(&key(ResourceType::McpServer, "prom"))
                .is_some_and(|s| s.state == ReconcileState::Synced)
        })
        .await,
        "status never reached synced"
    );
    assert!(store.mcp_server("default", "prom").is_some(), "status was not externalized");

    // Pretend the orchestrator registered the running service, then let
    // the periodic refresh pass: it must be a no-op.
    registry.insert("prom", service_info_for(&spec));
    let attempts = metrics.reconcile_attempts(ResourceType::McpServer);
    assert!(
        wait_for(Duration::from_secs(5), || {
            metrics.reconcile_attempts(ResourceType::McpServer) > attempts
        })
        .await,
        "periodic refresh never fired"
    );
    assert_eq!(orchestrator.call_count("start:prom"), 1, "refresh must not restart");

    h.manager.stop().await;
}
