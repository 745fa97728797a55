// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge from orchestrator runtime-state events to change events.
//!
//! A service crashing or recovering is a reason to reconcile its resource
//! even though no definition changed. The bridge consumes the
//! orchestrator's state-change stream and feeds update events into the
//! manager's intake.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use steward_adapters::ServiceStateChange;
use steward_core::{ChangeEvent, ChangeOp, ChangeSource, ResourceType};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Consumer of change events; implemented by the manager.
pub trait ChangeSink: Send + Sync {
    /// Deliver one change event to the reconciliation pipeline.
    fn submit(&self, event: ChangeEvent);

    /// True when events for this type should flow at all.
    fn accepts(&self, resource_type: ResourceType) -> bool;
}

/// Service type labels the orchestrator reports mapped to resource
/// types. Only MCP servers are bridged today.
fn map_service_type(service_type: &str) -> Option<ResourceType> {
    match service_type {
        "MCPServer" => Some(ResourceType::McpServer),
        _ => None,
    }
}

/// Subscribes to orchestrator state changes and emits change events.
pub struct StateChangeBridge {
    running: Arc<AtomicBool>,
    cancel: Mutex<Option<CancellationToken>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Default for StateChangeBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl StateChangeBridge {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            cancel: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Consume `events` until the channel closes or `stop` is called.
    pub fn start(&self, mut events: mpsc::Receiver<ServiceStateChange>, sink: Arc<dyn ChangeSink>) {
        let cancel = CancellationToken::new();
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);

        let loop_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                let change = tokio::select! {
                    _ = loop_cancel.cancelled() => break,
                    change = events.recv() => match change {
                        Some(change) => change,
                        None => break,
                    },
                };
                handle_state_change(sink.as_ref(), change);
            }
            running.store(false, Ordering::SeqCst);
            tracing::debug!("state change bridge stopped");
        });

        *self.cancel.lock() = Some(cancel);
        *self.task.lock() = Some(handle);
    }

    /// Stop consuming. Idempotent.
    pub fn stop(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel.cancel();
        }
    }
}

fn handle_state_change(sink: &dyn ChangeSink, change: ServiceStateChange) {
    let Some(rt) = map_service_type(&change.service_type) else {
        tracing::debug!(
            service = %change.name,
            service_type = %change.service_type,
            "ignoring state change for unmapped service type"
        );
        return;
    };
    if !sink.accepts(rt) {
        tracing::debug!(service = %change.name, "dropping state change for disabled resource type");
        return;
    }
    tracing::debug!(
        service = %change.name,
        old_state = %change.old_state,
        new_state = %change.new_state,
        health = change.health.as_str(),
        "service state changed, triggering reconcile"
    );
    sink.submit(ChangeEvent::new(rt, change.name, ChangeOp::Update, ChangeSource::ServiceState));
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
