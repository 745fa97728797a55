// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manager behavior tests, driven through manual triggers so no real
//! detector events are needed. Paused time makes backoff delays virtual.

mod dispatch;
mod lifecycle;
mod retry;

use super::*;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

/// Reconciler stub with a scriptable outcome sequence; once the script
/// is exhausted every further call returns the fallback.
pub(crate) struct StubReconciler {
    rt: ResourceType,
    script: Mutex<VecDeque<Result<ReconcileResult, ReconcileError>>>,
    fallback: Result<ReconcileResult, ReconcileError>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<ReconcileRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubReconciler {
    fn with_fallback(
        rt: ResourceType,
        script: Vec<Result<ReconcileResult, ReconcileError>>,
        fallback: Result<ReconcileResult, ReconcileError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            rt,
            script: Mutex::new(script.into()),
            fallback,
            delay: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub(crate) fn ok(rt: ResourceType) -> Arc<Self> {
        Self::with_fallback(rt, Vec::new(), Ok(ReconcileResult::done()))
    }

    pub(crate) fn with_script(
        rt: ResourceType,
        script: Vec<Result<ReconcileResult, ReconcileError>>,
    ) -> Arc<Self> {
        Self::with_fallback(rt, script, Ok(ReconcileResult::done()))
    }

    pub(crate) fn failing(rt: ResourceType, error: &str) -> Arc<Self> {
        Self::with_fallback(rt, Vec::new(), Err(ReconcileError::External(error.to_string())))
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub(crate) fn calls(&self) -> Vec<ReconcileRequest> {
        self.calls.lock().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reconciler for StubReconciler {
    fn resource_type(&self) -> ResourceType {
        self.rt
    }

    async fn reconcile(
        &self,
        req: &ReconcileRequest,
    ) -> Result<ReconcileResult, ReconcileError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.calls.lock().push(req.clone());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.script.lock().pop_front().unwrap_or_else(|| self.fallback.clone())
    }
}

/// A manager over a temporary filesystem base; the tempdir lives as long
/// as the manager.
pub(crate) struct TestManager {
    pub(crate) manager: Manager,
    _base: tempfile::TempDir,
}

pub(crate) fn build(config: ManagerConfig) -> TestManager {
    build_with_deps(config, ManagerDeps::default())
}

pub(crate) fn build_with_deps(mut config: ManagerConfig, deps: ManagerDeps) -> TestManager {
    let base = tempfile::tempdir().expect("tempdir");
    config.mode = Mode::Filesystem;
    config.base_dir = base.path().to_path_buf();
    if config.debounce_interval.is_zero() {
        config.debounce_interval = Duration::from_millis(10);
    }
    TestManager { manager: Manager::new(config, deps), _base: base }
}

pub(crate) fn default_manager() -> TestManager {
    build(ManagerConfig::default())
}

pub(crate) fn key(rt: ResourceType, name: &str) -> ResourceKey {
    ResourceKey::new(rt, None, name)
}

/// Poll until `cond` holds; panics after ~10 s of (virtual) time.
pub(crate) async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..2000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}
