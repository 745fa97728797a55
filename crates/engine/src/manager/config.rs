// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manager configuration.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use steward_core::ResourceType;

/// Change-detection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Watch resource definition directories on disk.
    Filesystem,
    /// Watch cluster state via the Kubernetes API.
    Kubernetes,
    /// Probe the cluster; fall back to the filesystem when unreachable.
    #[default]
    Auto,
}

/// Tunables for the reconciliation manager.
///
/// Zero durations and counts are replaced by defaults when the manager
/// is constructed, so embedders can fill only the fields they care about.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub worker_count: usize,
    /// Attempt cap per request; reaching it marks the resource Failed.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub debounce_interval: Duration,
    /// Budget for a single reconcile call.
    pub reconcile_timeout: Duration,
    pub mode: Mode,
    /// Base directory for filesystem mode.
    pub base_dir: PathBuf,
    /// Namespace scope for kubernetes mode; `None` watches the cluster.
    pub namespace: Option<String>,
    pub disabled_resource_types: HashSet<ResourceType>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5 * 60),
            debounce_interval: Duration::from_millis(500),
            reconcile_timeout: Duration::from_secs(30),
            mode: Mode::Auto,
            base_dir: PathBuf::from("."),
            namespace: None,
            disabled_resource_types: HashSet::new(),
        }
    }
}

impl ManagerConfig {
    /// Replace zero values with defaults.
    pub fn apply_defaults(mut self) -> Self {
        let defaults = ManagerConfig::default();
        if self.worker_count == 0 {
            self.worker_count = defaults.worker_count;
        }
        if self.max_retries == 0 {
            self.max_retries = defaults.max_retries;
        }
        if self.initial_backoff.is_zero() {
            self.initial_backoff = defaults.initial_backoff;
        }
        if self.max_backoff.is_zero() {
            self.max_backoff = defaults.max_backoff;
        }
        if self.debounce_interval.is_zero() {
            self.debounce_interval = defaults.debounce_interval;
        }
        if self.reconcile_timeout.is_zero() {
            self.reconcile_timeout = defaults.reconcile_timeout;
        }
        self
    }

    /// Backoff before retrying a failed attempt:
    /// `initial · 2^(attempt − 1)`, capped at `max_backoff`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let millis = (self.initial_backoff.as_millis() as u64).saturating_mul(1 << exponent);
        Duration::from_millis(millis).min(self.max_backoff)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
