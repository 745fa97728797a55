// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change events produced by detectors and consumed by the manager.

use crate::resource::{ResourceKey, ResourceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Operation carried by a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Create,
    Update,
    Delete,
}

impl ChangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOp::Create => "create",
            ChangeOp::Update => "update",
            ChangeOp::Delete => "delete",
        }
    }
}

/// Where a change event originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    Filesystem,
    Kubernetes,
    Manual,
    ServiceState,
}

impl ChangeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeSource::Filesystem => "filesystem",
            ChangeSource::Kubernetes => "kubernetes",
            ChangeSource::Manual => "manual",
            ChangeSource::ServiceState => "service_state",
        }
    }
}

/// A detected change to a declarative resource.
///
/// Produced by the filesystem and Kubernetes detectors, the orchestrator
/// state-change bridge, and manual triggers; consumed only by the manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub resource_type: ResourceType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub op: ChangeOp,
    pub source: ChangeSource,
    pub timestamp: DateTime<Utc>,
    /// Set for filesystem events: the file that changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

impl ChangeEvent {
    pub fn new(
        resource_type: ResourceType,
        name: impl Into<String>,
        op: ChangeOp,
        source: ChangeSource,
    ) -> Self {
        Self {
            resource_type,
            name: name.into(),
            namespace: None,
            op,
            source,
            timestamp: Utc::now(),
            file_path: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_file_path(mut self, path: PathBuf) -> Self {
        self.file_path = Some(path);
        self
    }

    /// Reconciliation identity for this event.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.resource_type, self.namespace.as_deref(), self.name.as_str())
    }
}

#[cfg(test)]
#[path = "change_tests.rs"]
mod tests;
