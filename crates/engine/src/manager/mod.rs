// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reconciliation manager: lifecycle, dispatch, retries and status
//! tracking.
//!
//! One root cancellation token governs every task the manager spawns
//! (event intake, workers, bridge); locks guard maps only and are never
//! held across calls into reconcilers or detectors.

mod config;
pub use config::{ManagerConfig, Mode};

use crate::bridge::{ChangeSink, StateChangeBridge};
use crate::delay::DelayedQueue;
use crate::detector::{Detector, FilesystemDetector, KubernetesDetector};
use crate::error::EngineError;
use crate::failure::FailureTracker;
use crate::queue::WorkQueue;
use crate::reconciler::Reconciler;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use steward_core::{
    sanitize, ChangeEvent, ChangeOp, ChangeSource, ReconcileError, ReconcileMetrics,
    ReconcileRequest, ReconcileResult, ReconcileState, ReconcileStatus, ResourceKey, ResourceType,
};
use steward_adapters::ServiceOrchestrator;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

const CHANGE_CHANNEL_CAPACITY: usize = 100;

/// Injected collaborators. Metrics and failure tracking are explicit so
/// embedders can share instances and tests can observe them.
pub struct ManagerDeps {
    /// Supplies the runtime state-change stream for the bridge; without
    /// it, no bridge runs.
    pub orchestrator: Option<Arc<dyn ServiceOrchestrator>>,
    pub metrics: Arc<ReconcileMetrics>,
    pub failures: Arc<FailureTracker>,
}

impl Default for ManagerDeps {
    fn default() -> Self {
        Self {
            orchestrator: None,
            metrics: Arc::new(ReconcileMetrics::default()),
            failures: Arc::new(FailureTracker::new()),
        }
    }
}

/// State shared between the manager facade, its workers, the event
/// intake loop and the state-change bridge.
struct ManagerState {
    config: ManagerConfig,
    queue: Arc<WorkQueue>,
    delayed: DelayedQueue,
    reconcilers: RwLock<HashMap<ResourceType, Arc<dyn Reconciler>>>,
    disabled: RwLock<HashSet<ResourceType>>,
    statuses: RwLock<HashMap<ResourceKey, ReconcileStatus>>,
    metrics: Arc<ReconcileMetrics>,
    change_tx: mpsc::Sender<ChangeEvent>,
}

impl ManagerState {
    fn is_registered(&self, rt: ResourceType) -> bool {
        self.reconcilers.read().contains_key(&rt)
    }

    fn is_enabled(&self, rt: ResourceType) -> bool {
        self.is_registered(rt) && !self.disabled.read().contains(&rt)
    }

    fn set_status(&self, key: &ResourceKey, update: impl FnOnce(&mut ReconcileStatus)) {
        let mut statuses = self.statuses.write();
        update(statuses.entry(key.clone()).or_default());
    }

    /// Route one change event into the queue.
    fn handle_change_event(&self, event: ChangeEvent) {
        let rt = event.resource_type;
        if !self.is_registered(rt) {
            tracing::debug!(resource_type = %rt, name = %event.name, "dropping event for unregistered resource type");
            self.metrics.record_event_dropped(rt);
            return;
        }
        if self.disabled.read().contains(&rt) {
            tracing::debug!(resource_type = %rt, name = %event.name, "dropping event for disabled resource type");
            self.metrics.record_event_dropped(rt);
            return;
        }

        let key = event.key();
        tracing::debug!(
            resource = %key,
            op = event.op.as_str(),
            source = event.source.as_str(),
            "change event accepted"
        );
        self.metrics.record_event_received(rt);
        self.set_status(&key, |status| status.state = ReconcileState::Pending);
        self.queue.add(ReconcileRequest::new(&key));
    }

    /// Run one request through its reconciler and dispatch the outcome.
    async fn process_request(&self, req: &ReconcileRequest) {
        let reconciler = self.reconcilers.read().get(&req.resource_type).cloned();
        let Some(reconciler) = reconciler else {
            tracing::warn!(resource_type = %req.resource_type, "no reconciler for queued request");
            return;
        };

        let key = req.key();
        self.set_status(&key, |status| status.state = ReconcileState::Reconciling);
        self.metrics.record_reconcile_attempt(req.resource_type);

        let budget = self.config.reconcile_timeout;
        let result = match tokio::time::timeout(budget, reconciler.reconcile(req)).await {
            Ok(result) => result,
            Err(_) => {
                self.metrics.record_reconcile_timeout(req.resource_type);
                Err(ReconcileError::TimedOut { after: budget })
            }
        };
        self.handle_result(req, &key, result);
    }

    fn handle_result(
        &self,
        req: &ReconcileRequest,
        key: &ResourceKey,
        result: Result<ReconcileResult, ReconcileError>,
    ) {
        let now = Utc::now();
        match result {
            Ok(outcome) => {
                self.metrics.record_reconcile_success(req.resource_type);
                self.set_status(key, |status| {
                    status.state = ReconcileState::Synced;
                    status.last_reconcile_time = Some(now);
                    status.last_error = None;
                    status.retry_count = 0;
                });
                if outcome.wants_requeue() {
                    let delay = outcome
                        .requeue_after
                        .filter(|d| !d.is_zero())
                        .unwrap_or(self.config.initial_backoff);
                    tracing::debug!(resource = %key, ?delay, "scheduling voluntary requeue");
                    self.delayed.add_after(req.clone(), delay);
                }
            }
            Err(err) => self.handle_error(req, key, &err, now),
        }
    }

    fn handle_error(
        &self,
        req: &ReconcileRequest,
        key: &ResourceKey,
        err: &ReconcileError,
        now: chrono::DateTime<Utc>,
    ) {
        self.metrics.record_reconcile_failure(req.resource_type);
        let message = sanitize(&err.to_string());

        if req.attempt >= self.config.max_retries {
            tracing::warn!(
                resource = %key,
                attempts = req.attempt,
                error = %message,
                "giving up after max retries"
            );
            self.metrics.record_terminal_failure(req.resource_type);
            self.set_status(key, |status| {
                status.state = ReconcileState::Failed;
                status.last_reconcile_time = Some(now);
                status.last_error = Some(message.clone());
                status.retry_count = req.attempt;
            });
            return;
        }

        let backoff = self.config.backoff_for_attempt(req.attempt);
        tracing::debug!(
            resource = %key,
            attempt = req.attempt,
            ?backoff,
            error = %message,
            "reconcile failed, scheduling retry"
        );
        self.metrics.record_retry(req.resource_type);
        self.set_status(key, |status| {
            status.state = ReconcileState::Error;
            status.last_reconcile_time = Some(now);
            status.last_error = Some(message.clone());
            status.retry_count = req.attempt;
        });
        self.delayed.add_after(req.retry(message), backoff);
    }
}

impl ChangeSink for ManagerState {
    fn submit(&self, event: ChangeEvent) {
        self.handle_change_event(event);
    }

    fn accepts(&self, resource_type: ResourceType) -> bool {
        self.is_enabled(resource_type)
    }
}

/// Composes detectors, the work queue, workers, reconcilers and status
/// tracking into one lifecycle.
pub struct Manager {
    state: Arc<ManagerState>,
    failures: Arc<FailureTracker>,
    orchestrator: Option<Arc<dyn ServiceOrchestrator>>,
    change_rx: Mutex<Option<mpsc::Receiver<ChangeEvent>>>,
    detector: Mutex<Option<Arc<Detector>>>,
    bridge: StateChangeBridge,
    cancel: CancellationToken,
    tracker: TaskTracker,
    running: AtomicBool,
    stopped: AtomicBool,
}

impl Manager {
    pub fn new(config: ManagerConfig, deps: ManagerDeps) -> Self {
        let config = config.apply_defaults();
        let (change_tx, change_rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let queue = Arc::new(WorkQueue::new());
        let state = Arc::new(ManagerState {
            delayed: DelayedQueue::new(Arc::clone(&queue)),
            queue,
            reconcilers: RwLock::new(HashMap::new()),
            disabled: RwLock::new(config.disabled_resource_types.clone()),
            statuses: RwLock::new(HashMap::new()),
            metrics: deps.metrics,
            change_tx,
            config,
        });
        Self {
            state,
            failures: deps.failures,
            orchestrator: deps.orchestrator,
            change_rx: Mutex::new(Some(change_rx)),
            detector: Mutex::new(None),
            bridge: StateChangeBridge::new(),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Register the reconciler for its resource type. While running, the
    /// detector starts watching the type immediately.
    pub fn register_reconciler(&self, reconciler: Arc<dyn Reconciler>) -> Result<(), EngineError> {
        let rt = reconciler.resource_type();
        {
            let mut reconcilers = self.state.reconcilers.write();
            if reconcilers.contains_key(&rt) {
                return Err(EngineError::ReconcilerExists(rt));
            }
            reconcilers.insert(rt, reconciler);
        }
        let detector = self.detector.lock().clone();
        if let Some(detector) = detector {
            detector.add_resource_type(rt)?;
        }
        Ok(())
    }

    async fn start_detector(&self, detector: &Detector) -> Result<(), EngineError> {
        for rt in self.registered_types() {
            detector.add_resource_type(rt)?;
        }
        detector.start(self.state.change_tx.clone()).await?;
        Ok(())
    }

    /// Resolve `Auto` against the environment: kubernetes when a cluster
    /// is reachable, filesystem otherwise.
    async fn resolve_mode(&self) -> Mode {
        match self.state.config.mode {
            Mode::Auto => {
                if kube::Client::try_default().await.is_ok() {
                    Mode::Kubernetes
                } else {
                    Mode::Filesystem
                }
            }
            mode => mode,
        }
    }

    /// Start the detector, the event intake loop, the worker pool and
    /// (with an orchestrator) the state-change bridge.
    pub async fn start(&self) -> Result<(), EngineError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyRunning);
        }

        let config = &self.state.config;
        let mode = self.resolve_mode().await;
        let detector = match mode {
            Mode::Kubernetes => Detector::Kubernetes(match &config.namespace {
                Some(ns) => KubernetesDetector::namespaced(ns.clone()),
                None => KubernetesDetector::new(),
            }),
            _ => Detector::Filesystem(FilesystemDetector::new(
                config.base_dir.clone(),
                config.debounce_interval,
            )),
        };
        if let Err(err) = self.start_detector(&detector).await {
            self.running.store(false, Ordering::SeqCst);
            return Err(err);
        }
        *self.detector.lock() = Some(Arc::new(detector));

        if let Some(mut change_rx) = self.change_rx.lock().take() {
            let state = Arc::clone(&self.state);
            let cancel = self.cancel.clone();
            self.tracker.spawn(async move {
                loop {
                    let event = tokio::select! {
                        _ = cancel.cancelled() => break,
                        event = change_rx.recv() => match event {
                            Some(event) => event,
                            None => break,
                        },
                    };
                    state.handle_change_event(event);
                }
                tracing::debug!("change event loop stopped");
            });
        }

        for worker_id in 0..self.state.config.worker_count {
            let state = Arc::clone(&self.state);
            let cancel = self.cancel.clone();
            self.tracker.spawn(async move {
                loop {
                    let Some(req) = state.queue.get(&cancel).await else {
                        break;
                    };
                    state.process_request(&req).await;
                    state.queue.done(&req);
                }
                tracing::debug!(worker_id, "reconcile worker stopped");
            });
        }

        if let Some(orchestrator) = &self.orchestrator {
            let events = orchestrator.subscribe_state_changes();
            self.bridge.start(events, Arc::clone(&self.state) as Arc<dyn ChangeSink>);
        }

        tracing::info!(
            ?mode,
            workers = self.state.config.worker_count,
            "reconciliation manager started"
        );
        Ok(())
    }

    /// Synthesize a manual change event through the normal intake:
    /// synchronous to enqueue, asynchronous to execute.
    pub fn trigger_reconcile(&self, rt: ResourceType, namespace: Option<&str>, name: &str) {
        let mut event = ChangeEvent::new(rt, name, ChangeOp::Update, ChangeSource::Manual);
        if let Some(namespace) = namespace {
            event = event.with_namespace(namespace);
        }
        self.state.handle_change_event(event);
    }

    pub fn disable_resource_type(&self, rt: ResourceType) {
        self.state.disabled.write().insert(rt);
    }

    pub fn enable_resource_type(&self, rt: ResourceType) {
        self.state.disabled.write().remove(&rt);
    }

    /// Registered and not disabled.
    pub fn is_resource_type_enabled(&self, rt: ResourceType) -> bool {
        self.state.is_enabled(rt)
    }

    /// The registered-minus-disabled set, sorted.
    pub fn enabled_resource_types(&self) -> Vec<ResourceType> {
        let disabled = self.state.disabled.read();
        let mut types: Vec<ResourceType> = self
            .state
            .reconcilers
            .read()
            .keys()
            .copied()
            .filter(|rt| !disabled.contains(rt))
            .collect();
        types.sort();
        types
    }

    fn registered_types(&self) -> Vec<ResourceType> {
        let mut types: Vec<ResourceType> = self.state.reconcilers.read().keys().copied().collect();
        types.sort();
        types
    }

    /// Tracked status for one identity.
    pub fn status(&self, key: &ResourceKey) -> Option<ReconcileStatus> {
        self.state.statuses.read().get(key).cloned()
    }

    /// Snapshot of every tracked status.
    pub fn statuses(&self) -> HashMap<ResourceKey, ReconcileStatus> {
        self.state.statuses.read().clone()
    }

    pub fn queue_len(&self) -> usize {
        self.state.queue.len()
    }

    pub fn metrics(&self) -> Arc<ReconcileMetrics> {
        Arc::clone(&self.state.metrics)
    }

    /// The shared failure tracker, for wiring into [`crate::StatusSync`].
    pub fn failure_tracker(&self) -> Arc<FailureTracker> {
        Arc::clone(&self.failures)
    }

    /// Idempotent shutdown: cancels the root context, stops detector and
    /// bridge, unblocks workers and waits for every spawned task.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        let detector = self.detector.lock().take();
        if let Some(detector) = detector {
            detector.stop();
        }
        self.bridge.stop();
        self.state.delayed.shutdown();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("reconciliation manager stopped");
    }
}

#[cfg(test)]
#[path = "../manager_tests/mod.rs"]
mod tests;
