// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes change detection via dynamic watchers.
//!
//! One watcher per registered resource type, cluster-wide or scoped to a
//! namespace. The initial list is consumed inline during `start` so a
//! kind the cluster cannot serve fails startup; the tail of each stream
//! runs in its own task until the detector stops. Dropped events are
//! harmless: the watcher re-lists on restart and re-delivers state.

use crate::error::DetectorError;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind};
use kube::runtime::watcher;
use kube::{Client, ResourceExt};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use steward_core::{ChangeEvent, ChangeOp, ChangeSource, ResourceType};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// API group serving the steward resource kinds.
pub const API_GROUP: &str = "steward.dev";
/// Served version of the steward resource kinds.
pub const API_VERSION: &str = "v1alpha1";

type WatchStream = BoxStream<'static, Result<watcher::Event<DynamicObject>, watcher::Error>>;

pub(crate) fn api_resource(rt: ResourceType) -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(API_GROUP, API_VERSION, rt.as_str()))
}

/// Watches cluster state for resource changes.
pub struct KubernetesDetector {
    namespace: Option<String>,
    resource_types: Arc<RwLock<HashSet<ResourceType>>>,
    client: Mutex<Option<Client>>,
    tx: Mutex<Option<mpsc::Sender<ChangeEvent>>>,
    watches: Arc<Mutex<HashMap<ResourceType, JoinHandle<()>>>>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl Default for KubernetesDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl KubernetesDetector {
    /// Cluster-wide detector.
    pub fn new() -> Self {
        Self::scoped(None)
    }

    /// Namespace-scoped detector.
    pub fn namespaced(namespace: impl Into<String>) -> Self {
        Self::scoped(Some(namespace.into()))
    }

    fn scoped(namespace: Option<String>) -> Self {
        Self {
            namespace,
            resource_types: Arc::new(RwLock::new(HashSet::new())),
            client: Mutex::new(None),
            tx: Mutex::new(None),
            watches: Arc::new(Mutex::new(HashMap::new())),
            cancel: Mutex::new(None),
        }
    }

    /// Register a type. When running, a watch starts immediately; its
    /// initial list surfaces as create events.
    pub fn add_resource_type(&self, rt: ResourceType) {
        self.resource_types.write().insert(rt);

        let client = self.client.lock().clone();
        let tx = self.tx.lock().clone();
        let cancel = self.cancel.lock().clone();
        if let (Some(client), Some(tx), Some(cancel)) = (client, tx, cancel) {
            let stream = watcher(self.api_for(&client, rt), watcher::Config::default()).boxed();
            self.spawn_watch_tail(rt, stream, tx, cancel);
        }
    }

    /// Unregister a type and abort its watch.
    pub fn remove_resource_type(&self, rt: ResourceType) {
        self.resource_types.write().remove(&rt);
        if let Some(handle) = self.watches.lock().remove(&rt) {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel.lock().is_some()
    }

    /// Connect to the cluster and watch every registered type. Waits for
    /// each type's initial list; a type that cannot sync fails the start.
    pub async fn start(&self, tx: mpsc::Sender<ChangeEvent>) -> Result<(), DetectorError> {
        if self.is_running() {
            return Err(DetectorError::AlreadyRunning);
        }
        let client = Client::try_default().await?;
        let cancel = CancellationToken::new();

        let types: Vec<ResourceType> = {
            let mut types: Vec<_> = self.resource_types.read().iter().copied().collect();
            types.sort();
            types
        };
        for rt in types {
            self.start_watch_synced(&client, rt, tx.clone(), cancel.clone()).await?;
        }

        *self.client.lock() = Some(client);
        *self.tx.lock() = Some(tx);
        *self.cancel.lock() = Some(cancel);
        tracing::info!(namespace = ?self.namespace, "kubernetes detector started");
        Ok(())
    }

    /// Cancel every watch task. Watch registrations on the API server are
    /// released implicitly when the streams drop.
    pub fn stop(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel.cancel();
        }
        for (_, handle) in self.watches.lock().drain() {
            handle.abort();
        }
        *self.client.lock() = None;
        *self.tx.lock() = None;
    }

    fn api_for(&self, client: &Client, rt: ResourceType) -> Api<DynamicObject> {
        let ar = api_resource(rt);
        match &self.namespace {
            Some(ns) => Api::namespaced_with(client.clone(), ns, &ar),
            None => Api::all_with(client.clone(), &ar),
        }
    }

    /// Consume a fresh watch stream until its initial list completes,
    /// emitting creates for existing objects, then hand the tail to a
    /// background task.
    async fn start_watch_synced(
        &self,
        client: &Client,
        rt: ResourceType,
        tx: mpsc::Sender<ChangeEvent>,
        cancel: CancellationToken,
    ) -> Result<(), DetectorError> {
        let mut stream = watcher(self.api_for(client, rt), watcher::Config::default()).boxed();
        loop {
            let event = match stream.next().await {
                Some(Ok(event)) => event,
                Some(Err(err)) => {
                    return Err(DetectorError::SyncFailed {
                        resource_type: rt,
                        reason: err.to_string(),
                    })
                }
                None => {
                    return Err(DetectorError::SyncFailed {
                        resource_type: rt,
                        reason: "watch stream ended".to_string(),
                    })
                }
            };
            match event {
                watcher::Event::Init => {}
                watcher::Event::InitApply(obj) => emit(&tx, rt, &obj, ChangeOp::Create),
                watcher::Event::InitDone => break,
                watcher::Event::Apply(obj) => emit(&tx, rt, &obj, ChangeOp::Update),
                watcher::Event::Delete(obj) => emit(&tx, rt, &obj, ChangeOp::Delete),
            }
        }
        self.spawn_watch_tail(rt, stream, tx, cancel);
        Ok(())
    }

    fn spawn_watch_tail(
        &self,
        rt: ResourceType,
        mut stream: WatchStream,
        tx: mpsc::Sender<ChangeEvent>,
        cancel: CancellationToken,
    ) {
        let handle = tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = stream.next() => next,
                };
                match next {
                    Some(Ok(event)) => handle_watch_event(&tx, rt, event),
                    Some(Err(err)) => {
                        // The watcher restarts internally; re-listed state
                        // arrives as InitApply events.
                        tracing::warn!(resource_type = %rt, error = %err, "watch stream error");
                    }
                    None => break,
                }
            }
            tracing::debug!(resource_type = %rt, "watch task stopped");
        });
        if let Some(old) = self.watches.lock().insert(rt, handle) {
            old.abort();
        }
    }
}

fn handle_watch_event(
    tx: &mpsc::Sender<ChangeEvent>,
    rt: ResourceType,
    event: watcher::Event<DynamicObject>,
) {
    match event {
        watcher::Event::Init | watcher::Event::InitDone => {}
        // Re-list after a watch restart: surface as creates, downstream
        // reconciliation is idempotent.
        watcher::Event::InitApply(obj) => emit(tx, rt, &obj, ChangeOp::Create),
        watcher::Event::Apply(obj) => emit(tx, rt, &obj, ChangeOp::Update),
        watcher::Event::Delete(obj) => emit(tx, rt, &obj, ChangeOp::Delete),
    }
}

fn emit(tx: &mpsc::Sender<ChangeEvent>, rt: ResourceType, obj: &DynamicObject, op: ChangeOp) {
    let name = obj.name_any();
    if name.is_empty() {
        tracing::warn!(resource_type = %rt, "ignoring object without a name");
        return;
    }
    let mut event = ChangeEvent::new(rt, name, op, ChangeSource::Kubernetes);
    if let Some(namespace) = obj.namespace() {
        event = event.with_namespace(namespace);
    }
    if tx.try_send(event).is_err() {
        // Resync re-delivers; losing one notification is safe.
        tracing::warn!(resource_type = %rt, "dropping kubernetes change event, channel full");
    }
}

#[cfg(test)]
#[path = "kubernetes_tests.rs"]
mod tests;
