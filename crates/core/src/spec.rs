// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desired-state documents supplied by resource providers.
//!
//! Parsing and loading these is an external concern; the engine only
//! consumes them through the provider traits. Field names follow the
//! camelCase wire format of the definition files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Desired state of an MCP server process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct McpServerSpec {
    pub name: String,
    /// Transport type, e.g. `stdio` or `http`.
    #[serde(rename = "type")]
    pub server_type: String,
    pub url: Option<String>,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    /// Request timeout in seconds.
    pub timeout: Option<u64>,
    pub tool_prefix: Option<String>,
    /// Free-form auth block; compared structurally so new fields do not
    /// silently escape the restart check.
    pub auth: Option<serde_json::Value>,
    pub auto_start: bool,
    pub description: Option<String>,
}

/// A tool invocation referenced from a service class or workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolCall {
    pub tool: String,
    pub args: BTreeMap<String, serde_json::Value>,
}

/// Lifecycle tool set of a service class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifecycleTools {
    pub start: ToolCall,
    pub stop: ToolCall,
    pub restart: Option<ToolCall>,
    pub health_check: Option<ToolCall>,
    pub status: Option<ToolCall>,
}

/// Desired state of a service class: a template for instantiable services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceClassSpec {
    pub name: String,
    pub service_type: String,
    pub description: Option<String>,
    pub lifecycle: LifecycleTools,
}

/// A declared workflow argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArgDef {
    #[serde(rename = "type")]
    pub arg_type: String,
    pub required: bool,
    pub default: Option<serde_json::Value>,
    pub description: Option<String>,
}

/// Gate evaluated before a workflow step runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StepCondition {
    pub tool: String,
    pub args: BTreeMap<String, serde_json::Value>,
}

/// One step of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowStep {
    pub id: String,
    pub tool: String,
    pub args: BTreeMap<String, serde_json::Value>,
    pub condition: Option<StepCondition>,
}

/// Desired state of a workflow definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowSpec {
    pub name: String,
    pub description: Option<String>,
    pub args: BTreeMap<String, ArgDef>,
    pub steps: Vec<WorkflowStep>,
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
