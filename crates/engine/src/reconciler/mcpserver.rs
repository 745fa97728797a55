// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MCP server reconciliation: drive the orchestrator toward the spec.

use crate::reconciler::diff::config_changed;
use crate::reconciler::Reconciler;
use crate::status_sync::{McpServerStatusPayload, StatusSync, DEFAULT_STATUS_SYNC_INTERVAL};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use steward_adapters::{ResourceProvider, ServiceOrchestrator, ServiceRegistry};
use steward_core::{
    HealthState, McpServerSpec, ReconcileError, ReconcileRequest, ReconcileResult, ResourceType,
};

/// Reconciles MCPServer resources against the running-service world.
pub struct McpServerReconciler {
    provider: Arc<dyn ResourceProvider<McpServerSpec>>,
    orchestrator: Arc<dyn ServiceOrchestrator>,
    registry: Arc<dyn ServiceRegistry>,
    sync: StatusSync,
    refresh_interval: Duration,
}

impl McpServerReconciler {
    pub fn new(
        provider: Arc<dyn ResourceProvider<McpServerSpec>>,
        orchestrator: Arc<dyn ServiceOrchestrator>,
        registry: Arc<dyn ServiceRegistry>,
        sync: StatusSync,
    ) -> Self {
        Self {
            provider,
            orchestrator,
            registry,
            sync,
            refresh_interval: DEFAULT_STATUS_SYNC_INTERVAL,
        }
    }

    /// Override the periodic status refresh interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Bring the running service in line with the desired spec.
    async fn converge(
        &self,
        req: &ReconcileRequest,
        spec: &McpServerSpec,
    ) -> Result<(), ReconcileError> {
        match self.registry.get(&req.name) {
            None => {
                if spec.auto_start {
                    tracing::info!(service = %req.name, "starting mcp server");
                    self.orchestrator
                        .start_service(&req.name)
                        .await
                        .map_err(ReconcileError::external)?;
                }
            }
            Some(info) => {
                if config_changed(spec, &info.data) {
                    tracing::info!(service = %req.name, "configuration changed, restarting");
                    self.registry
                        .update_config(&req.name, spec)
                        .map_err(ReconcileError::external)?;
                    self.orchestrator
                        .restart_service(&req.name)
                        .await
                        .map_err(ReconcileError::external)?;
                }
            }
        }
        Ok(())
    }

    /// Tear down a service whose spec is gone.
    async fn remove(&self, req: &ReconcileRequest) -> Result<(), ReconcileError> {
        if self.registry.get(&req.name).is_none() {
            return Ok(());
        }
        tracing::info!(service = %req.name, "spec removed, stopping service");
        match self.orchestrator.stop_service(&req.name).await {
            Ok(()) => Ok(()),
            // Already gone: stopping a missing service is a success.
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(ReconcileError::external(err)),
        }
    }

    fn observed_payload(&self, name: &str) -> McpServerStatusPayload {
        match self.registry.get(name) {
            Some(info) => McpServerStatusPayload {
                state: info.state,
                health: info.health,
                last_error: info.last_error,
            },
            None => McpServerStatusPayload {
                state: "stopped".to_string(),
                health: HealthState::Unknown,
                last_error: None,
            },
        }
    }
}

#[async_trait]
impl Reconciler for McpServerReconciler {
    fn resource_type(&self) -> ResourceType {
        ResourceType::McpServer
    }

    async fn reconcile(
        &self,
        req: &ReconcileRequest,
    ) -> Result<ReconcileResult, ReconcileError> {
        let spec = match self.provider.get_spec(&req.namespace, &req.name).await {
            Ok(spec) => Some(spec),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(ReconcileError::external(err)),
        };

        match spec {
            Some(spec) => {
                self.converge(req, &spec).await?;
                self.sync.sync_mcp_server(&req.key(), self.observed_payload(&req.name)).await;
                // Periodic refresh keeps the externalized state current
                // even without definition changes.
                Ok(ReconcileResult::requeue_after(self.refresh_interval))
            }
            None => {
                self.remove(req).await?;
                self.sync.sync_mcp_server(&req.key(), self.observed_payload(&req.name)).await;
                Ok(ReconcileResult::done())
            }
        }
    }
}

#[cfg(test)]
#[path = "mcpserver_tests.rs"]
mod tests;
