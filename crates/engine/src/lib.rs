// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! steward-engine: the steward reconciliation engine
//!
//! Change detectors (filesystem or Kubernetes), the orchestrator
//! state-change bridge and manual triggers feed a deduplicating work
//! queue; a worker pool dispatches requests to per-type reconcilers under
//! a timeout; failures retry with exponential backoff; observed state is
//! written back to a status store with conflict retries. The [`Manager`]
//! composes the pipeline and owns its lifecycle.

pub mod bridge;
pub mod delay;
pub mod detector;
pub mod error;
pub mod failure;
pub mod manager;
pub mod queue;
pub mod reconciler;
pub mod status_sync;

pub use bridge::{ChangeSink, StateChangeBridge};
pub use delay::DelayedQueue;
pub use detector::{Detector, FilesystemDetector, KubernetesDetector};
pub use error::{DetectorError, EngineError};
pub use failure::FailureTracker;
pub use manager::{Manager, ManagerConfig, ManagerDeps, Mode};
pub use queue::WorkQueue;
pub use reconciler::{
    McpServerReconciler, Reconciler, ServiceClassReconciler, WorkflowReconciler,
};
pub use status_sync::{StatusSync, DEFAULT_STATUS_SYNC_INTERVAL};
