// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-identity reconciliation status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileState {
    /// An event arrived; work is queued but not yet picked up.
    Pending,
    /// A worker is currently reconciling this identity.
    Reconciling,
    /// Last reconcile succeeded.
    Synced,
    /// Last reconcile failed; a backoff retry is scheduled.
    Error,
    /// Retries exhausted. Terminal until a new event arrives.
    Failed,
}

impl ReconcileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileState::Pending => "pending",
            ReconcileState::Reconciling => "reconciling",
            ReconcileState::Synced => "synced",
            ReconcileState::Error => "error",
            ReconcileState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReconcileState::Failed)
    }
}

/// In-memory status for one resource identity.
///
/// Created lazily on the first event, mutated only by the manager under
/// its lock, never destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileStatus {
    pub state: ReconcileState,
    pub last_reconcile_time: Option<DateTime<Utc>>,
    /// Sanitized; safe to surface externally.
    pub last_error: Option<String>,
    pub retry_count: u32,
}

impl Default for ReconcileStatus {
    fn default() -> Self {
        Self {
            state: ReconcileState::Pending,
            last_reconcile_time: None,
            last_error: None,
            retry_count: 0,
        }
    }
}

/// Service health as reported by the orchestrator and registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    #[default]
    Unknown,
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Unknown => "unknown",
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::Unhealthy => "unhealthy",
        }
    }
}
