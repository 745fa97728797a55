// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort status externalization with conflict retries.
//!
//! Reconciliation success never depends on a status write: terminal sync
//! failures are classified, counted and fed to the failure tracker, then
//! swallowed. Only an optimistic-lock conflict retries, by re-reading the
//! document and re-applying the precomputed payload.

use crate::failure::FailureTracker;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use steward_adapters::{StatusStore, StoreError};
use steward_core::{sanitize, HealthState, ReconcileMetrics, ResourceKey};

/// Default interval between periodic MCP server status refreshes.
pub const DEFAULT_STATUS_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Write attempts per sync; only conflicts consume extra attempts.
const DEFAULT_WRITE_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(50);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(1);

/// Observed runtime state written into an MCP server status document.
#[derive(Debug, Clone, Default)]
pub struct McpServerStatusPayload {
    pub state: String,
    pub health: HealthState,
    pub last_error: Option<String>,
}

/// Validation outcome written into service class and workflow documents.
#[derive(Debug, Clone, Default)]
pub struct ValidationStatusPayload {
    pub valid: bool,
    pub validation_errors: Vec<String>,
    pub referenced_tools: Vec<String>,
}

/// The status-sync protocol: compute once, write with conflict retries,
/// classify and absorb terminal failures.
pub struct StatusSync {
    store: Option<Arc<dyn StatusStore>>,
    metrics: Arc<ReconcileMetrics>,
    failures: Arc<FailureTracker>,
    write_attempts: u32,
}

impl StatusSync {
    pub fn new(
        store: Option<Arc<dyn StatusStore>>,
        metrics: Arc<ReconcileMetrics>,
        failures: Arc<FailureTracker>,
    ) -> Self {
        Self { store, metrics, failures, write_attempts: DEFAULT_WRITE_ATTEMPTS }
    }

    /// Externalize the observed state of an MCP server.
    pub async fn sync_mcp_server(&self, key: &ResourceKey, payload: McpServerStatusPayload) {
        let Some(store) = self.store.clone() else {
            return;
        };
        self.metrics.record_status_sync_attempt(key.resource_type);
        let last_error = payload.last_error.as_deref().map(sanitize);

        let result = retry_on_conflict(self.write_attempts, || {
            let store = Arc::clone(&store);
            let key = key.clone();
            let payload = payload.clone();
            let last_error = last_error.clone();
            async move {
                let mut doc = store.get_mcp_server(&key.namespace, &key.name).await?;
                doc.state = payload.state.clone();
                doc.health = payload.health;
                doc.last_error = last_error;
                doc.last_checked = Some(Utc::now());
                store.update_mcp_server_status(&key.namespace, &key.name, &doc).await
            }
        })
        .await;
        self.finish(key, result);
    }

    /// Externalize a service class validation outcome.
    pub async fn sync_service_class(&self, key: &ResourceKey, payload: ValidationStatusPayload) {
        let Some(store) = self.store.clone() else {
            return;
        };
        self.metrics.record_status_sync_attempt(key.resource_type);
        let payload = sanitize_validation(payload);

        let result = retry_on_conflict(self.write_attempts, || {
            let store = Arc::clone(&store);
            let key = key.clone();
            let payload = payload.clone();
            async move {
                let mut doc = store.get_service_class(&key.namespace, &key.name).await?;
                doc.valid = payload.valid;
                doc.validation_errors = payload.validation_errors.clone();
                doc.referenced_tools = payload.referenced_tools.clone();
                store.update_service_class_status(&key.namespace, &key.name, &doc).await
            }
        })
        .await;
        self.finish(key, result);
    }

    /// Externalize a workflow validation outcome.
    pub async fn sync_workflow(
        &self,
        key: &ResourceKey,
        payload: ValidationStatusPayload,
        step_count: usize,
    ) {
        let Some(store) = self.store.clone() else {
            return;
        };
        self.metrics.record_status_sync_attempt(key.resource_type);
        let payload = sanitize_validation(payload);

        let result = retry_on_conflict(self.write_attempts, || {
            let store = Arc::clone(&store);
            let key = key.clone();
            let payload = payload.clone();
            async move {
                let mut doc = store.get_workflow(&key.namespace, &key.name).await?;
                doc.valid = payload.valid;
                doc.validation_errors = payload.validation_errors.clone();
                doc.referenced_tools = payload.referenced_tools.clone();
                doc.step_count = step_count;
                store.update_workflow_status(&key.namespace, &key.name, &doc).await
            }
        })
        .await;
        self.finish(key, result);
    }

    fn finish(&self, key: &ResourceKey, result: Result<(), StoreError>) {
        match result {
            Ok(()) => {
                self.metrics.record_status_sync_success(key.resource_type);
                self.failures.record_success(key);
            }
            Err(err) => {
                let reason = err.failure_reason();
                self.metrics.record_status_sync_failure(key.resource_type, reason);
                let message = sanitize(&err.to_string());
                if self.failures.record_failure(key, &message) {
                    tracing::debug!(
                        resource = %key,
                        reason,
                        failures = self.failures.failures(key),
                        error = %message,
                        "status sync failed"
                    );
                }
            }
        }
    }
}

fn sanitize_validation(payload: ValidationStatusPayload) -> ValidationStatusPayload {
    ValidationStatusPayload {
        validation_errors: payload.validation_errors.iter().map(|e| sanitize(e)).collect(),
        ..payload
    }
}

/// Run `op` until it succeeds, fails with a non-conflict error, or the
/// attempt budget is spent on conflicts.
async fn retry_on_conflict<F, Fut>(attempts: u32, op: F) -> Result<(), StoreError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<(), StoreError>>,
{
    let mut delay = RETRY_BASE_DELAY;
    for attempt in 1..=attempts.max(1) {
        match op().await {
            Ok(()) => return Ok(()),
            Err(StoreError::Conflict) if attempt < attempts => {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(RETRY_MAX_DELAY);
            }
            Err(err) => return Err(err),
        }
    }
    Err(StoreError::Conflict)
}

#[cfg(test)]
#[path = "status_sync_tests.rs"]
mod tests;
