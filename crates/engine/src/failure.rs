// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consecutive-failure tracking with log suppression.
//!
//! Persistent failures (an unreachable status store, a permanently
//! conflicting document) would otherwise log on every attempt. The
//! tracker counts consecutive failures per resource and tells callers
//! when a failure is worth logging.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use steward_core::{Clock, ResourceKey, SystemClock};

/// A suppressed failure still logs once this much time has passed since
/// the last logged one.
const LOG_AFTER_ELAPSED: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct FailureEntry {
    consecutive_failures: u64,
    last_failure: Instant,
    last_logged_at: Option<Instant>,
    last_error: String,
}

/// Per-resource consecutive failure counter.
pub struct FailureTracker<C: Clock = SystemClock> {
    entries: RwLock<HashMap<ResourceKey, FailureEntry>>,
    clock: C,
}

impl FailureTracker<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for FailureTracker<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> FailureTracker<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { entries: RwLock::new(HashMap::new()), clock }
    }

    /// Record a failure; returns true when the caller should log it.
    pub fn record_failure(&self, key: &ResourceKey, error: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let entry = entries.entry(key.clone()).or_insert_with(|| FailureEntry {
            consecutive_failures: 0,
            last_failure: now,
            last_logged_at: None,
            last_error: String::new(),
        });
        entry.consecutive_failures += 1;
        entry.last_failure = now;
        entry.last_error = error.to_string();

        let should_log = matches_schedule(entry.consecutive_failures)
            || entry.last_logged_at.is_none_or(|at| now.duration_since(at) > LOG_AFTER_ELAPSED);
        if should_log {
            entry.last_logged_at = Some(now);
        }
        should_log
    }

    /// Clear the entry after a success.
    pub fn record_success(&self, key: &ResourceKey) {
        self.entries.write().remove(key);
    }

    /// Current consecutive failure count for a resource.
    pub fn failures(&self, key: &ResourceKey) -> u64 {
        self.entries.read().get(key).map_or(0, |e| e.consecutive_failures)
    }

    /// Last recorded error for a resource, if any.
    pub fn last_error(&self, key: &ResourceKey) -> Option<String> {
        self.entries.read().get(key).map(|e| e.last_error.clone())
    }

    /// Resources currently tracked as failing.
    pub fn tracked(&self) -> usize {
        self.entries.read().len()
    }
}

/// Count-based log schedule: always for the first three, then every 10th
/// up to 100, every 100th up to 1000, every 1000th beyond that.
fn matches_schedule(failures: u64) -> bool {
    if failures <= 3 {
        return true;
    }
    if failures <= 100 {
        return failures % 10 == 0;
    }
    if failures <= 1000 {
        return failures % 100 == 0;
    }
    failures % 1000 == 0
}

#[cfg(test)]
#[path = "failure_tests.rs"]
mod tests;
