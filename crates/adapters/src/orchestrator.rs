// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service orchestrator interface.
//!
//! The orchestrator owns running MCP server processes; the engine drives
//! it through a narrow start/stop/restart surface and listens to its
//! runtime state transitions via the state-change bridge.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use steward_core::HealthState;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from service lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// The named service is unknown. Treated as success when stopping.
    #[error("service not found: {0}")]
    NotFound(String),
    #[error("orchestrator failed: {0}")]
    Failed(String),
}

impl OrchestratorError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, OrchestratorError::NotFound(_))
    }
}

/// Runtime state transition reported by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStateChange {
    pub name: String,
    /// Free-form service type label; only `"MCPServer"` maps to a
    /// reconcilable resource type today.
    pub service_type: String,
    pub old_state: String,
    pub new_state: String,
    pub health: HealthState,
}

/// Lifecycle operations on running services.
#[async_trait]
pub trait ServiceOrchestrator: Send + Sync {
    async fn start_service(&self, name: &str) -> Result<(), OrchestratorError>;
    async fn stop_service(&self, name: &str) -> Result<(), OrchestratorError>;
    async fn restart_service(&self, name: &str) -> Result<(), OrchestratorError>;

    /// Subscribe to runtime state transitions. Each call returns an
    /// independent stream; the channel closes when the orchestrator
    /// shuts down.
    fn subscribe_state_changes(&self) -> mpsc::Receiver<ServiceStateChange>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{OrchestratorError, ServiceOrchestrator, ServiceStateChange};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakeOrchestratorState {
        calls: Vec<String>,
        start_error: Option<OrchestratorError>,
        stop_error: Option<OrchestratorError>,
        restart_error: Option<OrchestratorError>,
        subscribers: Vec<mpsc::Sender<ServiceStateChange>>,
    }

    /// Recording orchestrator for testing; failures are scriptable per
    /// operation and state changes can be emitted to subscribers.
    #[derive(Clone, Default)]
    pub struct FakeOrchestrator {
        inner: Arc<Mutex<FakeOrchestratorState>>,
    }

    impl FakeOrchestrator {
        pub fn new() -> Self {
            Self::default()
        }

        /// Recorded calls as `"op:name"` strings, in order.
        pub fn calls(&self) -> Vec<String> {
            self.inner.lock().calls.clone()
        }

        /// Number of recorded calls matching `"op:name"`.
        pub fn call_count(&self, call: &str) -> usize {
            self.inner.lock().calls.iter().filter(|c| c.as_str() == call).count()
        }

        pub fn set_start_error(&self, error: Option<OrchestratorError>) {
            self.inner.lock().start_error = error;
        }

        pub fn set_stop_error(&self, error: Option<OrchestratorError>) {
            self.inner.lock().stop_error = error;
        }

        pub fn set_restart_error(&self, error: Option<OrchestratorError>) {
            self.inner.lock().restart_error = error;
        }

        /// Deliver a state change to every live subscriber.
        pub fn emit_state_change(&self, change: ServiceStateChange) {
            let subscribers = self.inner.lock().subscribers.clone();
            for tx in subscribers {
                let _ = tx.try_send(change.clone());
            }
        }

        /// Drop all subscriber channels, closing the streams.
        pub fn close_subscribers(&self) {
            self.inner.lock().subscribers.clear();
        }
    }

    #[async_trait]
    impl ServiceOrchestrator for FakeOrchestrator {
        async fn start_service(&self, name: &str) -> Result<(), OrchestratorError> {
            let mut state = self.inner.lock();
            state.calls.push(format!("start:{name}"));
            state.start_error.clone().map_or(Ok(()), Err)
        }

        async fn stop_service(&self, name: &str) -> Result<(), OrchestratorError> {
            let mut state = self.inner.lock();
            state.calls.push(format!("stop:{name}"));
            state.stop_error.clone().map_or(Ok(()), Err)
        }

        async fn restart_service(&self, name: &str) -> Result<(), OrchestratorError> {
            let mut state = self.inner.lock();
            state.calls.push(format!("restart:{name}"));
            state.restart_error.clone().map_or(Ok(()), Err)
        }

        fn subscribe_state_changes(&self) -> mpsc::Receiver<ServiceStateChange> {
            let (tx, rx) = mpsc::channel(16);
            self.inner.lock().subscribers.push(tx);
            rx
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeOrchestrator;
