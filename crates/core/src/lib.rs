// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! steward-core: data model for the steward reconciliation engine

pub mod change;
pub mod clock;
pub mod metrics;
pub mod request;
pub mod resource;
pub mod sanitize;
pub mod spec;
pub mod status;

pub use change::{ChangeEvent, ChangeOp, ChangeSource};
pub use clock::{Clock, FakeClock, SystemClock};
pub use metrics::{MetricsSnapshot, ReconcileMetrics};
pub use request::{ReconcileError, ReconcileRequest, ReconcileResult};
pub use resource::{
    is_valid_resource_type, ResourceKey, ResourceType, UnknownResourceType, DEFAULT_NAMESPACE,
};
pub use sanitize::sanitize;
pub use spec::{
    ArgDef, LifecycleTools, McpServerSpec, ServiceClassSpec, StepCondition, ToolCall, WorkflowSpec,
    WorkflowStep,
};
pub use status::{HealthState, ReconcileState, ReconcileStatus};
