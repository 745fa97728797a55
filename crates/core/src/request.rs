// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work-queue elements and reconciler outcomes.

use crate::resource::{ResourceKey, ResourceType};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// A unit of reconciliation work.
///
/// Queue deduplication uses [`ReconcileRequest::key`] only; `attempt` and
/// `last_error` are carried state and do not participate in identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub resource_type: ResourceType,
    pub name: String,
    pub namespace: String,
    /// 1-based attempt counter.
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ReconcileRequest {
    /// First-attempt request for the given identity.
    pub fn new(key: &ResourceKey) -> Self {
        Self {
            resource_type: key.resource_type,
            name: key.name.clone(),
            namespace: key.namespace.clone(),
            attempt: 1,
            last_error: None,
        }
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.resource_type, Some(&self.namespace), self.name.as_str())
    }

    /// Follow-up request after a failed attempt.
    pub fn retry(&self, error: impl Into<String>) -> Self {
        Self {
            resource_type: self.resource_type,
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            attempt: self.attempt + 1,
            last_error: Some(error.into()),
        }
    }
}

/// Outcome of a successful reconcile call.
///
/// An error outcome travels on the `Result` channel as [`ReconcileError`];
/// this struct only describes voluntary requeueing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    /// Re-enqueue after the default backoff even though no error occurred.
    pub requeue: bool,
    /// Re-enqueue after this delay (periodic refresh).
    pub requeue_after: Option<Duration>,
}

impl ReconcileResult {
    /// Nothing further to do; the resource is in sync.
    pub fn done() -> Self {
        Self::default()
    }

    /// Schedule a delayed re-entry after `delay`.
    pub fn requeue_after(delay: Duration) -> Self {
        Self { requeue: false, requeue_after: Some(delay) }
    }

    /// True when the manager should schedule a delayed requeue.
    pub fn wants_requeue(&self) -> bool {
        self.requeue || self.requeue_after.is_some()
    }
}

/// Errors a reconciler can surface.
///
/// Every variant is retried by the manager with exponential backoff up to
/// the configured attempt cap; the distinction feeds logging and status
/// payloads, not dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The desired spec violates its own invariants; retried because the
    /// spec is expected to be corrected.
    #[error("invalid spec: {}", errors.join("; "))]
    Validation { errors: Vec<String> },

    /// An external collaborator (orchestrator, registry, store, provider)
    /// failed.
    #[error("{0}")]
    External(String),

    /// Synthesized by the manager when a reconcile call exceeds its
    /// timeout budget.
    #[error("reconciliation timed out after {after:?}")]
    TimedOut { after: Duration },
}

impl ReconcileError {
    pub fn external(err: impl std::fmt::Display) -> Self {
        ReconcileError::External(err.to_string())
    }

    pub fn validation(errors: Vec<String>) -> Self {
        ReconcileError::Validation { errors }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
