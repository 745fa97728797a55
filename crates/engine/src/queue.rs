// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deduplicating work queue feeding the reconcile workers.
//!
//! Invariants:
//! - at most one queued request per identity; re-adding replaces the
//!   payload in place;
//! - while an identity is being processed, adds land in a dirty map and
//!   are re-enqueued exactly once when [`WorkQueue::done`] runs;
//! - adds after shutdown are dropped.
//!
//! Together these serialize reconciliation per identity: a worker holds an
//! identity from `get` to `done`, and the latest superseding payload wins.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use steward_core::{ReconcileRequest, ResourceKey};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Inner {
    order: VecDeque<ResourceKey>,
    payloads: HashMap<ResourceKey, ReconcileRequest>,
    processing: HashSet<ResourceKey>,
    dirty: HashMap<ResourceKey, ReconcileRequest>,
    shutting_down: bool,
}

/// FIFO queue with identity deduplication and per-identity serialization.
pub struct WorkQueue {
    inner: Mutex<Inner>,
    /// One permit per queued identity; closed on shutdown so every
    /// waiting `get` unblocks.
    ready: Semaphore,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()), ready: Semaphore::new(0) }
    }

    /// Enqueue a request, deduplicating on identity.
    pub fn add(&self, req: ReconcileRequest) {
        let key = req.key();
        let mut inner = self.inner.lock();
        if inner.shutting_down {
            return;
        }
        if inner.processing.contains(&key) {
            // Superseded while in flight; re-enqueued once by done().
            inner.dirty.insert(key, req);
            return;
        }
        if inner.payloads.insert(key.clone(), req).is_none() {
            inner.order.push_back(key);
            drop(inner);
            self.ready.add_permits(1);
        }
    }

    /// Dequeue the next request, blocking until one is available, the
    /// queue shuts down, or `cancel` fires.
    ///
    /// The returned identity is held in the processing set until `done`.
    /// Returns `None` when cancelled, or once the queue has shut down and
    /// drained.
    pub async fn get(&self, cancel: &CancellationToken) -> Option<ReconcileRequest> {
        loop {
            let permit = tokio::select! {
                permit = self.ready.acquire() => permit,
                _ = cancel.cancelled() => return None,
            };
            match permit {
                Ok(permit) => {
                    // The pop below consumes what this permit accounted for.
                    permit.forget();
                    if let Some(req) = self.take_next() {
                        return Some(req);
                    }
                    // Raced with a shutdown drain; re-check.
                }
                // Closed: shutting down. Drain whatever is left.
                Err(_) => return self.take_next(),
            }
        }
    }

    fn take_next(&self) -> Option<ReconcileRequest> {
        let mut inner = self.inner.lock();
        let key = inner.order.pop_front()?;
        let req = inner.payloads.remove(&key)?;
        inner.processing.insert(key);
        Some(req)
    }

    /// Mark a request finished, re-enqueueing the dirty payload if one
    /// arrived while it was processing. Without a matching `get` this is
    /// a silent no-op.
    pub fn done(&self, req: &ReconcileRequest) {
        let key = req.key();
        let mut inner = self.inner.lock();
        if !inner.processing.remove(&key) {
            return;
        }
        if inner.shutting_down {
            return;
        }
        if let Some(dirty) = inner.dirty.remove(&key) {
            inner.payloads.insert(key.clone(), dirty);
            inner.order.push_back(key);
            drop(inner);
            self.ready.add_permits(1);
        }
    }

    /// Queued request count, excluding processing and dirty entries.
    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Begin shutdown: further adds drop, every waiting `get` unblocks.
    /// Idempotent.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        if inner.shutting_down {
            return;
        }
        inner.shutting_down = true;
        drop(inner);
        self.ready.close();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.lock().shutting_down
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
