// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process reconciliation counters.
//!
//! Injectable: the engine takes an explicit `Arc<ReconcileMetrics>` so
//! tests can assert on counts and embedders can share one instance
//! process-wide. `snapshot` produces a serializable copy for status
//! queries; no exporter format is assumed.

use crate::resource::ResourceType;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// One counter per resource type.
#[derive(Debug, Default)]
struct TypeCounter([AtomicU64; 3]);

impl TypeCounter {
    fn idx(rt: ResourceType) -> usize {
        match rt {
            ResourceType::McpServer => 0,
            ResourceType::ServiceClass => 1,
            ResourceType::Workflow => 2,
        }
    }

    fn incr(&self, rt: ResourceType) {
        self.0[Self::idx(rt)].fetch_add(1, Ordering::Relaxed);
    }

    fn get(&self, rt: ResourceType) -> u64 {
        self.0[Self::idx(rt)].load(Ordering::Relaxed)
    }

    fn snapshot(&self) -> BTreeMap<String, u64> {
        ResourceType::ALL
            .into_iter()
            .map(|rt| (rt.as_str().to_string(), self.get(rt)))
            .collect()
    }
}

/// Counter set for the reconciliation pipeline.
#[derive(Debug, Default)]
pub struct ReconcileMetrics {
    events_received: TypeCounter,
    events_dropped: TypeCounter,
    reconcile_attempts: TypeCounter,
    reconcile_successes: TypeCounter,
    reconcile_failures: TypeCounter,
    reconcile_timeouts: TypeCounter,
    retries: TypeCounter,
    terminal_failures: TypeCounter,
    status_sync_attempts: TypeCounter,
    status_sync_successes: TypeCounter,
    /// Status-sync failures keyed by classified reason.
    status_sync_failures: Mutex<BTreeMap<(ResourceType, &'static str), u64>>,
}

impl ReconcileMetrics {
    pub fn record_event_received(&self, rt: ResourceType) {
        self.events_received.incr(rt);
    }

    pub fn record_event_dropped(&self, rt: ResourceType) {
        self.events_dropped.incr(rt);
    }

    pub fn record_reconcile_attempt(&self, rt: ResourceType) {
        self.reconcile_attempts.incr(rt);
    }

    pub fn record_reconcile_success(&self, rt: ResourceType) {
        self.reconcile_successes.incr(rt);
    }

    pub fn record_reconcile_failure(&self, rt: ResourceType) {
        self.reconcile_failures.incr(rt);
    }

    pub fn record_reconcile_timeout(&self, rt: ResourceType) {
        self.reconcile_timeouts.incr(rt);
    }

    pub fn record_retry(&self, rt: ResourceType) {
        self.retries.incr(rt);
    }

    pub fn record_terminal_failure(&self, rt: ResourceType) {
        self.terminal_failures.incr(rt);
    }

    pub fn record_status_sync_attempt(&self, rt: ResourceType) {
        self.status_sync_attempts.incr(rt);
    }

    pub fn record_status_sync_success(&self, rt: ResourceType) {
        self.status_sync_successes.incr(rt);
    }

    pub fn record_status_sync_failure(&self, rt: ResourceType, reason: &'static str) {
        *self.status_sync_failures.lock().entry((rt, reason)).or_insert(0) += 1;
    }

    // Read accessors, used by tests and status queries.

    pub fn events_received(&self, rt: ResourceType) -> u64 {
        self.events_received.get(rt)
    }

    pub fn events_dropped(&self, rt: ResourceType) -> u64 {
        self.events_dropped.get(rt)
    }

    pub fn reconcile_attempts(&self, rt: ResourceType) -> u64 {
        self.reconcile_attempts.get(rt)
    }

    pub fn reconcile_successes(&self, rt: ResourceType) -> u64 {
        self.reconcile_successes.get(rt)
    }

    pub fn reconcile_failures(&self, rt: ResourceType) -> u64 {
        self.reconcile_failures.get(rt)
    }

    pub fn reconcile_timeouts(&self, rt: ResourceType) -> u64 {
        self.reconcile_timeouts.get(rt)
    }

    pub fn retries(&self, rt: ResourceType) -> u64 {
        self.retries.get(rt)
    }

    pub fn terminal_failures(&self, rt: ResourceType) -> u64 {
        self.terminal_failures.get(rt)
    }

    pub fn status_sync_attempts(&self, rt: ResourceType) -> u64 {
        self.status_sync_attempts.get(rt)
    }

    pub fn status_sync_successes(&self, rt: ResourceType) -> u64 {
        self.status_sync_successes.get(rt)
    }

    pub fn status_sync_failure_count(&self, rt: ResourceType, reason: &str) -> u64 {
        self.status_sync_failures
            .lock()
            .iter()
            .filter(|((t, r), _)| *t == rt && *r == reason)
            .map(|(_, count)| *count)
            .sum()
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let status_sync_failures = self
            .status_sync_failures
            .lock()
            .iter()
            .map(|((rt, reason), count)| (format!("{}/{}", rt.as_str(), reason), *count))
            .collect();

        MetricsSnapshot {
            events_received: self.events_received.snapshot(),
            events_dropped: self.events_dropped.snapshot(),
            reconcile_attempts: self.reconcile_attempts.snapshot(),
            reconcile_successes: self.reconcile_successes.snapshot(),
            reconcile_failures: self.reconcile_failures.snapshot(),
            reconcile_timeouts: self.reconcile_timeouts.snapshot(),
            retries: self.retries.snapshot(),
            terminal_failures: self.terminal_failures.snapshot(),
            status_sync_attempts: self.status_sync_attempts.snapshot(),
            status_sync_successes: self.status_sync_successes.snapshot(),
            status_sync_failures,
        }
    }
}

/// Serializable snapshot of the counter set, keyed by resource type
/// (and `Type/reason` for status-sync failures).
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub events_received: BTreeMap<String, u64>,
    pub events_dropped: BTreeMap<String, u64>,
    pub reconcile_attempts: BTreeMap<String, u64>,
    pub reconcile_successes: BTreeMap<String, u64>,
    pub reconcile_failures: BTreeMap<String, u64>,
    pub reconcile_timeouts: BTreeMap<String, u64>,
    pub retries: BTreeMap<String, u64>,
    pub terminal_failures: BTreeMap<String, u64>,
    pub status_sync_attempts: BTreeMap<String, u64>,
    pub status_sync_successes: BTreeMap<String, u64>,
    pub status_sync_failures: BTreeMap<String, u64>,
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
