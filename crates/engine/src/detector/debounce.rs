// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time-window coalescing of raw filesystem events.
//!
//! Editors produce bursts (create + several writes + rename) for a single
//! logical change. The debouncer holds one pending event per identity and
//! emits it once the window passes without another raw event.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use steward_core::{ChangeEvent, ChangeOp, ResourceKey};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Merge an already-pending operation with a newer one.
///
/// A create followed by updates is still a create to consumers; every
/// other combination takes the newer operation.
pub(crate) fn merge_ops(old: ChangeOp, new: ChangeOp) -> ChangeOp {
    match (old, new) {
        (ChangeOp::Create, ChangeOp::Update) => ChangeOp::Create,
        (_, new) => new,
    }
}

struct PendingSlot {
    seq: u64,
    op: ChangeOp,
    handle: JoinHandle<()>,
}

/// Coalesces bursts of raw events per identity onto an output channel.
pub(crate) struct Debouncer {
    interval: Duration,
    tx: mpsc::Sender<ChangeEvent>,
    pending: Arc<Mutex<HashMap<ResourceKey, PendingSlot>>>,
    seq: AtomicU64,
}

impl Debouncer {
    pub(crate) fn new(interval: Duration, tx: mpsc::Sender<ChangeEvent>) -> Self {
        Self {
            interval,
            tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
            seq: AtomicU64::new(0),
        }
    }

    /// Feed a raw event, (re)scheduling the identity's emit timer.
    pub(crate) fn observe(&self, mut event: ChangeEvent) {
        let key = event.key();
        let mut pending = self.pending.lock();
        if let Some(slot) = pending.remove(&key) {
            slot.handle.abort();
            event.op = merge_ops(slot.op, event.op);
        }

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let op = event.op;
        let interval = self.interval;
        let tx = self.tx.clone();
        let pending_map = Arc::clone(&self.pending);
        let timer_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            let current = {
                let mut pending = pending_map.lock();
                match pending.get(&timer_key) {
                    Some(slot) if slot.seq == seq => {
                        pending.remove(&timer_key);
                        true
                    }
                    _ => false,
                }
            };
            if !current {
                return;
            }
            if let Err(err) = tx.try_send(event) {
                tracing::warn!(error = %err, "dropping coalesced change event, channel full");
            }
        });

        pending.insert(key, PendingSlot { seq, op, handle });
    }

    /// Identities with a pending emit.
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Abort every pending timer without emitting.
    pub(crate) fn cancel_all(&self) {
        let mut pending = self.pending.lock();
        for (_, slot) in pending.drain() {
            slot.handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "debounce_tests.rs"]
mod tests;
