// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow validation and status reporting.

use crate::reconciler::{referenced_tools, Reconciler};
use crate::status_sync::{StatusSync, ValidationStatusPayload};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use steward_adapters::ResourceProvider;
use steward_core::{
    ReconcileError, ReconcileRequest, ReconcileResult, ResourceType, WorkflowSpec,
};

/// Reconciles Workflow resources: validates the definition and
/// externalizes the outcome together with the referenced tool set.
pub struct WorkflowReconciler {
    provider: Arc<dyn ResourceProvider<WorkflowSpec>>,
    sync: StatusSync,
}

impl WorkflowReconciler {
    pub fn new(provider: Arc<dyn ResourceProvider<WorkflowSpec>>, sync: StatusSync) -> Self {
        Self { provider, sync }
    }
}

fn validate(spec: &WorkflowSpec) -> Vec<String> {
    let mut errors = Vec::new();
    if spec.name.is_empty() {
        errors.push("name is required".to_string());
    }
    if spec.steps.is_empty() {
        errors.push("at least one step is required".to_string());
    }

    let mut seen = HashSet::new();
    for (index, step) in spec.steps.iter().enumerate() {
        if step.id.is_empty() {
            errors.push(format!("step {index}: id is required"));
        } else if !seen.insert(step.id.as_str()) {
            errors.push(format!("step {index}: duplicate id {:?}", step.id));
        }
        if step.tool.is_empty() {
            errors.push(format!("step {index}: tool is required"));
        }
    }

    for (name, arg) in &spec.args {
        if arg.arg_type.is_empty() {
            errors.push(format!("arg {name:?}: type is required"));
        }
    }
    errors
}

fn tools(spec: &WorkflowSpec) -> Vec<String> {
    referenced_tools(spec.steps.iter().flat_map(|step| {
        [
            Some(step.tool.clone()),
            step.condition.as_ref().map(|c| c.tool.clone()),
        ]
        .into_iter()
        .flatten()
    }))
}

#[async_trait]
impl Reconciler for WorkflowReconciler {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Workflow
    }

    async fn reconcile(
        &self,
        req: &ReconcileRequest,
    ) -> Result<ReconcileResult, ReconcileError> {
        let spec = match self.provider.get_spec(&req.namespace, &req.name).await {
            Ok(spec) => spec,
            Err(err) if err.is_not_found() => return Ok(ReconcileResult::done()),
            Err(err) => return Err(ReconcileError::external(err)),
        };

        let errors = validate(&spec);
        let payload = ValidationStatusPayload {
            valid: errors.is_empty(),
            validation_errors: errors.clone(),
            referenced_tools: tools(&spec),
        };
        self.sync.sync_workflow(&req.key(), payload, spec.steps.len()).await;

        if errors.is_empty() {
            Ok(ReconcileResult::done())
        } else {
            Err(ReconcileError::validation(errors))
        }
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
