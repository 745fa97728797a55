// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service class validation and status reporting.

use crate::reconciler::{referenced_tools, Reconciler};
use crate::status_sync::{StatusSync, ValidationStatusPayload};
use async_trait::async_trait;
use std::sync::Arc;
use steward_adapters::ResourceProvider;
use steward_core::{
    ReconcileError, ReconcileRequest, ReconcileResult, ResourceType, ServiceClassSpec,
};

/// Reconciles ServiceClass resources: validates the definition and
/// externalizes the outcome. No service lifecycle is driven here.
pub struct ServiceClassReconciler {
    provider: Arc<dyn ResourceProvider<ServiceClassSpec>>,
    sync: StatusSync,
}

impl ServiceClassReconciler {
    pub fn new(provider: Arc<dyn ResourceProvider<ServiceClassSpec>>, sync: StatusSync) -> Self {
        Self { provider, sync }
    }
}

fn validate(spec: &ServiceClassSpec) -> Vec<String> {
    let mut errors = Vec::new();
    if spec.name.is_empty() {
        errors.push("name is required".to_string());
    }
    if spec.service_type.is_empty() {
        errors.push("serviceType is required".to_string());
    }
    if spec.lifecycle.start.tool.is_empty() {
        errors.push("lifecycle start tool is required".to_string());
    }
    if spec.lifecycle.stop.tool.is_empty() {
        errors.push("lifecycle stop tool is required".to_string());
    }
    errors
}

fn tools(spec: &ServiceClassSpec) -> Vec<String> {
    let lifecycle = &spec.lifecycle;
    referenced_tools(
        [
            Some(lifecycle.start.tool.clone()),
            Some(lifecycle.stop.tool.clone()),
            lifecycle.restart.as_ref().map(|t| t.tool.clone()),
            lifecycle.health_check.as_ref().map(|t| t.tool.clone()),
            lifecycle.status.as_ref().map(|t| t.tool.clone()),
        ]
        .into_iter()
        .flatten(),
    )
}

#[async_trait]
impl Reconciler for ServiceClassReconciler {
    fn resource_type(&self) -> ResourceType {
        ResourceType::ServiceClass
    }

    async fn reconcile(
        &self,
        req: &ReconcileRequest,
    ) -> Result<ReconcileResult, ReconcileError> {
        let spec = match self.provider.get_spec(&req.namespace, &req.name).await {
            Ok(spec) => spec,
            // Nothing to tear down for a template resource.
            Err(err) if err.is_not_found() => return Ok(ReconcileResult::done()),
            Err(err) => return Err(ReconcileError::external(err)),
        };

        let errors = validate(&spec);
        let payload = ValidationStatusPayload {
            valid: errors.is_empty(),
            validation_errors: errors.clone(),
            referenced_tools: tools(&spec),
        };
        self.sync.sync_service_class(&req.key(), payload).await;

        if errors.is_empty() {
            Ok(ReconcileResult::done())
        } else {
            // Requeued: the definition is expected to be corrected.
            Err(ReconcileError::validation(errors))
        }
    }
}

#[cfg(test)]
#[path = "serviceclass_tests.rs"]
mod tests;
