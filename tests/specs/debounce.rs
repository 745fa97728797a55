// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rapid edits to one definition file collapse into a single
//! reconciliation.

use crate::support::{harness, wait_for, ScriptedReconciler};
use serial_test::serial;
use std::time::Duration;
use steward_core::ResourceType;
use steward_engine::{ManagerConfig, ManagerDeps};

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn rapid_edits_reconcile_once() {
    let h = harness(
        ManagerConfig { debounce_interval: Duration::from_millis(300), ..Default::default() },
        ManagerDeps::default(),
    );
    let reconciler = ScriptedReconciler::succeeding(ResourceType::Workflow);
    h.manager.register_reconciler(reconciler.clone()).unwrap();
    h.manager.start().await.unwrap();

    // Create, then four rapid rewrites.
    let path = h.base.path().join("workflows/w.yaml");
    std::fs::write(&path, "name: w\n").unwrap();
    for revision in 0..4 {
        std::fs::write(&path, format!("name: w\nrev: {revision}\n")).unwrap();
    }

    assert!(
        wait_for(Duration::from_secs(5), || reconciler.call_count() == 1).await,
        "the coalesced event never arrived"
    );

    // No further events emerge from the burst.
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(reconciler.call_count(), 1, "burst must coalesce into one reconcile");
    assert_eq!(h.manager.metrics().events_received(ResourceType::Workflow), 1);

    h.manager.stop().await;
}
