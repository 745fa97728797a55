// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-resource reconcilers invoked by the manager's workers.

mod diff;
pub mod mcpserver;
pub mod serviceclass;
pub mod workflow;

pub use mcpserver::McpServerReconciler;
pub use serviceclass::ServiceClassReconciler;
pub use workflow::WorkflowReconciler;

use async_trait::async_trait;
use steward_core::{ReconcileError, ReconcileRequest, ReconcileResult, ResourceType};

/// A policy callback reconciling one resource type.
///
/// Implementations must be idempotent: reconciling an unchanged desired
/// state twice produces no additional external side effects. Reconcilers
/// never touch the queue or the status tracker; outcomes travel through
/// the returned result and the status-sync protocol.
#[async_trait]
pub trait Reconciler: Send + Sync {
    fn resource_type(&self) -> ResourceType;

    async fn reconcile(
        &self,
        req: &ReconcileRequest,
    ) -> Result<ReconcileResult, ReconcileError>;
}

/// Sorted, deduplicated tool names with empties removed.
pub(crate) fn referenced_tools<I>(tools: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut tools: Vec<String> = tools.into_iter().filter(|tool| !tool.is_empty()).collect();
    tools.sort();
    tools.dedup();
    tools
}
