// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the scenario tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use steward_core::{
    ReconcileError, ReconcileRequest, ReconcileResult, ResourceKey, ResourceType,
};
use steward_engine::{Manager, ManagerConfig, ManagerDeps, Mode, Reconciler};

/// A manager in filesystem mode over a tempdir; the directory outlives
/// the manager.
pub struct Harness {
    pub manager: Manager,
    pub base: tempfile::TempDir,
}

pub fn harness(mut config: ManagerConfig, deps: ManagerDeps) -> Harness {
    let base = tempfile::tempdir().expect("tempdir");
    config.mode = Mode::Filesystem;
    config.base_dir = base.path().to_path_buf();
    Harness { manager: Manager::new(config, deps), base }
}

pub fn key(rt: ResourceType, name: &str) -> ResourceKey {
    ResourceKey::new(rt, None, name)
}

/// Poll until `cond` holds or `limit` passes (virtual time under paused
/// runtimes, wall time otherwise).
pub async fn wait_for(limit: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let step = Duration::from_millis(5);
    let mut waited = Duration::ZERO;
    while waited < limit {
        if cond() {
            return true;
        }
        tokio::time::sleep(step).await;
        waited += step;
    }
    cond()
}

/// Counting reconciler with a scriptable outcome sequence; the fallback
/// outcome repeats once the script is exhausted.
pub struct ScriptedReconciler {
    rt: ResourceType,
    script: Mutex<VecDeque<Result<ReconcileResult, ReconcileError>>>,
    fallback: Result<ReconcileResult, ReconcileError>,
    calls: Mutex<Vec<ReconcileRequest>>,
}

impl ScriptedReconciler {
    pub fn new(
        rt: ResourceType,
        script: Vec<Result<ReconcileResult, ReconcileError>>,
        fallback: Result<ReconcileResult, ReconcileError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            rt,
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn succeeding(rt: ResourceType) -> Arc<Self> {
        Self::new(rt, Vec::new(), Ok(ReconcileResult::done()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<ReconcileRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Reconciler for ScriptedReconciler {
    fn resource_type(&self) -> ResourceType {
        self.rt
    }

    async fn reconcile(
        &self,
        req: &ReconcileRequest,
    ) -> Result<ReconcileResult, ReconcileError> {
        self.calls.lock().push(req.clone());
        self.script.lock().pop_front().unwrap_or_else(|| self.fallback.clone())
    }
}
