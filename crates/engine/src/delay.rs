// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delayed requeue timers wrapping the work queue.
//!
//! Used for two distinct delays: error-retry backoff and voluntary
//! requeue-after (periodic refresh). At most one timer is pending per
//! identity; a newer `add_after` replaces the previous timer, and fires
//! after shutdown are no-ops.

use crate::queue::WorkQueue;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use steward_core::{ReconcileRequest, ResourceKey};
use tokio::task::JoinHandle;

struct TimerSlot {
    seq: u64,
    handle: JoinHandle<()>,
}

type TimerMap = HashMap<ResourceKey, TimerSlot>;

/// Per-identity delayed insertion into a [`WorkQueue`].
pub struct DelayedQueue {
    queue: Arc<WorkQueue>,
    /// `None` once shut down.
    timers: Arc<Mutex<Option<TimerMap>>>,
    seq: AtomicU64,
}

impl DelayedQueue {
    pub fn new(queue: Arc<WorkQueue>) -> Self {
        Self { queue, timers: Arc::new(Mutex::new(Some(HashMap::new()))), seq: AtomicU64::new(0) }
    }

    /// Forward immediately to the inner queue.
    pub fn add(&self, req: ReconcileRequest) {
        self.queue.add(req);
    }

    /// Enqueue `req` after `delay`, replacing any pending timer for the
    /// same identity.
    pub fn add_after(&self, req: ReconcileRequest, delay: Duration) {
        let key = req.key();
        let mut guard = self.timers.lock();
        let Some(timers) = guard.as_mut() else {
            return; // shut down
        };

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::clone(&self.queue);
        let timer_map = Arc::clone(&self.timers);
        let timer_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Deregister, but only if this timer is still the current one
            // for the identity (a replacement may have raced the fire).
            let current = {
                let mut guard = timer_map.lock();
                match guard.as_mut() {
                    Some(timers) if timers.get(&timer_key).is_some_and(|s| s.seq == seq) => {
                        timers.remove(&timer_key);
                        true
                    }
                    _ => false,
                }
            };
            if current {
                queue.add(req);
            }
        });

        if let Some(old) = timers.insert(key, TimerSlot { seq, handle }) {
            old.handle.abort();
        }
    }

    /// Identities with a pending timer.
    pub fn pending_timers(&self) -> usize {
        self.timers.lock().as_ref().map_or(0, TimerMap::len)
    }

    /// Cancel all pending timers and shut the inner queue down. Idempotent.
    pub fn shutdown(&self) {
        if let Some(timers) = self.timers.lock().take() {
            for (_, slot) in timers {
                slot.handle.abort();
            }
        }
        self.queue.shutdown();
    }
}

#[cfg(test)]
#[path = "delay_tests.rs"]
mod tests;
