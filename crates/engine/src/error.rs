// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types

use steward_core::ResourceType;
use thiserror::Error;

/// Errors from change detectors.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("kubernetes client error: {0}")]
    Kube(#[from] kube::Error),

    /// The initial list for a resource type did not complete; fatal to
    /// detector start.
    #[error("initial sync failed for {resource_type}: {reason}")]
    SyncFailed { resource_type: ResourceType, reason: String },

    #[error("detector already running")]
    AlreadyRunning,
}

/// Errors from manager lifecycle and registration.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("reconciler already registered for {0}")]
    ReconcilerExists(ResourceType),

    #[error("manager already running")]
    AlreadyRunning,

    #[error(transparent)]
    Detector(#[from] DetectorError),
}
