// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change detectors feeding the manager's change channel.

pub(crate) mod debounce;
pub mod filesystem;
pub mod kubernetes;

pub use filesystem::FilesystemDetector;
pub use kubernetes::KubernetesDetector;

use crate::error::DetectorError;
use steward_core::{ChangeEvent, ResourceType};
use tokio::sync::mpsc;

/// A change detector of either backing, selected by the manager's mode.
pub enum Detector {
    Filesystem(FilesystemDetector),
    Kubernetes(KubernetesDetector),
}

impl Detector {
    pub fn add_resource_type(&self, rt: ResourceType) -> Result<(), DetectorError> {
        match self {
            Detector::Filesystem(detector) => detector.add_resource_type(rt),
            Detector::Kubernetes(detector) => {
                detector.add_resource_type(rt);
                Ok(())
            }
        }
    }

    pub fn remove_resource_type(&self, rt: ResourceType) {
        match self {
            Detector::Filesystem(detector) => detector.remove_resource_type(rt),
            Detector::Kubernetes(detector) => detector.remove_resource_type(rt),
        }
    }

    pub async fn start(&self, tx: mpsc::Sender<ChangeEvent>) -> Result<(), DetectorError> {
        match self {
            Detector::Filesystem(detector) => detector.start(tx),
            Detector::Kubernetes(detector) => detector.start(tx).await,
        }
    }

    pub fn stop(&self) {
        match self {
            Detector::Filesystem(detector) => detector.stop(),
            Detector::Kubernetes(detector) => detector.stop(),
        }
    }
}
