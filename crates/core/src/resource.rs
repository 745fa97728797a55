// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource type enumeration and reconciliation identity.
//!
//! `ResourceType` is a closed set: the engine dispatches to exactly one
//! registered reconciler per variant. `ResourceKey` is the identity used to
//! deduplicate queue entries and serialize reconciliation per resource.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace assumed when an event carries none (filesystem mode, manual
/// triggers without an explicit namespace).
pub const DEFAULT_NAMESPACE: &str = "default";

/// The closed set of declarative resource types the engine reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    #[serde(rename = "MCPServer")]
    McpServer,
    ServiceClass,
    Workflow,
}

impl ResourceType {
    /// Every resource type, for registration loops.
    pub const ALL: [ResourceType; 3] =
        [ResourceType::McpServer, ResourceType::ServiceClass, ResourceType::Workflow];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::McpServer => "MCPServer",
            ResourceType::ServiceClass => "ServiceClass",
            ResourceType::Workflow => "Workflow",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized resource type string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource type: {0:?}")]
pub struct UnknownResourceType(pub String);

impl FromStr for ResourceType {
    type Err = UnknownResourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MCPServer" => Ok(ResourceType::McpServer),
            "ServiceClass" => Ok(ResourceType::ServiceClass),
            "Workflow" => Ok(ResourceType::Workflow),
            _ => Err(UnknownResourceType(s.to_string())),
        }
    }
}

/// True iff `s` names a resource type, exact case.
pub fn is_valid_resource_type(s: &str) -> bool {
    s.parse::<ResourceType>().is_ok()
}

/// Identity of a reconcilable resource: `(type, namespace, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub resource_type: ResourceType,
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    /// Build a key, normalizing a missing or empty namespace to
    /// [`DEFAULT_NAMESPACE`].
    pub fn new(
        resource_type: ResourceType,
        namespace: Option<&str>,
        name: impl Into<String>,
    ) -> Self {
        let namespace = match namespace {
            Some(ns) if !ns.is_empty() => ns.to_string(),
            _ => DEFAULT_NAMESPACE.to_string(),
        };
        Self { resource_type, namespace, name: name.into() }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.resource_type, self.namespace, self.name)
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
