// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Disabled resource types are inert: no enqueue, no reconciler call.

use crate::support::{harness, key, ScriptedReconciler};
use std::collections::HashSet;
use std::time::Duration;
use steward_core::ResourceType;
use steward_engine::{ManagerConfig, ManagerDeps};

#[tokio::test(start_paused = true)]
async fn disabled_type_is_never_reconciled() {
    let config = ManagerConfig {
        disabled_resource_types: HashSet::from([ResourceType::Workflow]),
        ..Default::default()
    };
    let h = harness(config, ManagerDeps::default());
    let reconciler = ScriptedReconciler::succeeding(ResourceType::Workflow);
    h.manager.register_reconciler(reconciler.clone()).unwrap();
    h.manager.start().await.unwrap();

    assert!(!h.manager.is_resource_type_enabled(ResourceType::Workflow));
    h.manager.trigger_reconcile(ResourceType::Workflow, None, "wf1");

    assert_eq!(h.manager.queue_len(), 0);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(reconciler.call_count(), 0);
    assert!(h.manager.status(&key(ResourceType::Workflow, "wf1")).is_none());
    assert_eq!(h.manager.metrics().events_dropped(ResourceType::Workflow), 1);

    h.manager.stop().await;
}
