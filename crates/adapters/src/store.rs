// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent status store interface.
//!
//! Writes are optimistically locked: an update against a stale
//! `resource_version` fails with [`StoreError::Conflict`], which the
//! status-sync protocol retries after re-reading the document. Any other
//! error is terminal for that sync.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use steward_core::HealthState;
use thiserror::Error;

/// Errors from status store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Optimistic-lock failure: the stored document is newer than the
    /// one the writer read.
    #[error("status document conflict")]
    Conflict,
    /// The backing resource does not exist (e.g. the CRD was deleted).
    #[error("status document not found")]
    NotFound,
    #[error("api server unreachable: {0}")]
    Unreachable(String),
    #[error("status operation timed out")]
    Timeout,
    #[error("permission denied")]
    PermissionDenied,
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("get failed: {0}")]
    GetFailed(String),
    #[error("update failed: {0}")]
    UpdateFailed(String),
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Classification label for per-(type, reason) failure counters.
    ///
    /// `Conflict` classifies as `conflict_after_retries` because the sync
    /// protocol only reports it once its retry budget is exhausted.
    pub fn failure_reason(&self) -> &'static str {
        match self {
            StoreError::Conflict => "conflict_after_retries",
            StoreError::NotFound => "crd_not_found",
            StoreError::Unreachable(_) => "api_server_unreachable",
            StoreError::Timeout => "timeout",
            StoreError::PermissionDenied => "permission_denied",
            StoreError::AuthenticationFailed => "authentication_failed",
            StoreError::UpdateFailed(_) => "update_status_failed",
            StoreError::GetFailed(_) => "get_crd_failed",
            StoreError::Other(_) => "unknown",
        }
    }
}

/// Externalized status of an MCP server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct McpServerStatusDoc {
    pub resource_version: u64,
    pub state: String,
    pub health: HealthState,
    pub last_error: Option<String>,
    pub last_checked: Option<DateTime<Utc>>,
}

/// Externalized status of a service class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceClassStatusDoc {
    pub resource_version: u64,
    pub valid: bool,
    pub validation_errors: Vec<String>,
    pub referenced_tools: Vec<String>,
}

/// Externalized status of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowStatusDoc {
    pub resource_version: u64,
    pub valid: bool,
    pub validation_errors: Vec<String>,
    pub referenced_tools: Vec<String>,
    pub step_count: usize,
}

/// Typed status documents, one get/update pair per resource kind.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn get_mcp_server(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<McpServerStatusDoc, StoreError>;

    async fn update_mcp_server_status(
        &self,
        namespace: &str,
        name: &str,
        doc: &McpServerStatusDoc,
    ) -> Result<(), StoreError>;

    async fn get_service_class(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceClassStatusDoc, StoreError>;

    async fn update_service_class_status(
        &self,
        namespace: &str,
        name: &str,
        doc: &ServiceClassStatusDoc,
    ) -> Result<(), StoreError>;

    async fn get_workflow(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<WorkflowStatusDoc, StoreError>;

    async fn update_workflow_status(
        &self,
        namespace: &str,
        name: &str,
        doc: &WorkflowStatusDoc,
    ) -> Result<(), StoreError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeStoreState {
        mcp_servers: HashMap<(String, String), McpServerStatusDoc>,
        service_classes: HashMap<(String, String), ServiceClassStatusDoc>,
        workflows: HashMap<(String, String), WorkflowStatusDoc>,
        /// Next N updates fail with `Conflict`; each conflict also bumps
        /// the stored version, simulating a concurrent writer.
        conflicts_remaining: u32,
        /// When set, every operation fails with this error.
        error: Option<StoreError>,
        get_calls: u32,
        update_calls: u32,
    }

    /// Versioned in-memory status store for testing.
    #[derive(Clone, Default)]
    pub struct FakeStatusStore {
        inner: Arc<Mutex<FakeStoreState>>,
    }

    impl FakeStatusStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the next `n` updates to fail with a conflict.
        pub fn conflict_next(&self, n: u32) {
            self.inner.lock().conflicts_remaining = n;
        }

        /// Make every operation fail with the given error until cleared.
        pub fn fail_with(&self, error: Option<StoreError>) {
            self.inner.lock().error = error;
        }

        pub fn get_calls(&self) -> u32 {
            self.inner.lock().get_calls
        }

        pub fn update_calls(&self) -> u32 {
            self.inner.lock().update_calls
        }

        pub fn mcp_server(&self, namespace: &str, name: &str) -> Option<McpServerStatusDoc> {
            self.inner.lock().mcp_servers.get(&key(namespace, name)).cloned()
        }

        pub fn service_class(&self, namespace: &str, name: &str) -> Option<ServiceClassStatusDoc> {
            self.inner.lock().service_classes.get(&key(namespace, name)).cloned()
        }

        pub fn workflow(&self, namespace: &str, name: &str) -> Option<WorkflowStatusDoc> {
            self.inner.lock().workflows.get(&key(namespace, name)).cloned()
        }
    }

    fn key(namespace: &str, name: &str) -> (String, String) {
        (namespace.to_string(), name.to_string())
    }

    impl FakeStoreState {
        fn check_get(&mut self) -> Result<(), StoreError> {
            self.get_calls += 1;
            self.error.clone().map_or(Ok(()), Err)
        }

        fn check_update(&mut self) -> Result<(), StoreError> {
            self.update_calls += 1;
            if let Some(err) = self.error.clone() {
                return Err(err);
            }
            if self.conflicts_remaining > 0 {
                self.conflicts_remaining -= 1;
                return Err(StoreError::Conflict);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl StatusStore for FakeStatusStore {
        async fn get_mcp_server(
            &self,
            namespace: &str,
            name: &str,
        ) -> Result<McpServerStatusDoc, StoreError> {
            let mut state = self.inner.lock();
            state.check_get()?;
            Ok(state.mcp_servers.get(&key(namespace, name)).cloned().unwrap_or_default())
        }

        async fn update_mcp_server_status(
            &self,
            namespace: &str,
            name: &str,
            doc: &McpServerStatusDoc,
        ) -> Result<(), StoreError> {
            let mut state = self.inner.lock();
            if let Err(err) = state.check_update() {
                if err == StoreError::Conflict {
                    let entry = state.mcp_servers.entry(key(namespace, name)).or_default();
                    entry.resource_version += 1;
                }
                return Err(err);
            }
            let mut doc = doc.clone();
            doc.resource_version += 1;
            state.mcp_servers.insert(key(namespace, name), doc);
            Ok(())
        }

        async fn get_service_class(
            &self,
            namespace: &str,
            name: &str,
        ) -> Result<ServiceClassStatusDoc, StoreError> {
            let mut state = self.inner.lock();
            state.check_get()?;
            Ok(state.service_classes.get(&key(namespace, name)).cloned().unwrap_or_default())
        }

        async fn update_service_class_status(
            &self,
            namespace: &str,
            name: &str,
            doc: &ServiceClassStatusDoc,
        ) -> Result<(), StoreError> {
            let mut state = self.inner.lock();
            if let Err(err) = state.check_update() {
                if err == StoreError::Conflict {
                    let entry = state.service_classes.entry(key(namespace, name)).or_default();
                    entry.resource_version += 1;
                }
                return Err(err);
            }
            let mut doc = doc.clone();
            doc.resource_version += 1;
            state.service_classes.insert(key(namespace, name), doc);
            Ok(())
        }

        async fn get_workflow(
            &self,
            namespace: &str,
            name: &str,
        ) -> Result<WorkflowStatusDoc, StoreError> {
            let mut state = self.inner.lock();
            state.check_get()?;
            Ok(state.workflows.get(&key(namespace, name)).cloned().unwrap_or_default())
        }

        async fn update_workflow_status(
            &self,
            namespace: &str,
            name: &str,
            doc: &WorkflowStatusDoc,
        ) -> Result<(), StoreError> {
            let mut state = self.inner.lock();
            if let Err(err) = state.check_update() {
                if err == StoreError::Conflict {
                    let entry = state.workflows.entry(key(namespace, name)).or_default();
                    entry.resource_version += 1;
                }
                return Err(err);
            }
            let mut doc = doc.clone();
            doc.resource_version += 1;
            state.workflows.insert(key(namespace, name), doc);
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeStatusStore;

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
