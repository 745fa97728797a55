// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;
use std::time::Duration;
use steward_core::ResourceType;

fn req(name: &str) -> ReconcileRequest {
    ReconcileRequest::new(&ResourceKey::new(ResourceType::McpServer, None, name))
}

#[tokio::test]
async fn add_get_done_round_trip() {
    let queue = WorkQueue::new();
    let cancel = CancellationToken::new();

    queue.add(req("a"));
    assert_eq!(queue.len(), 1);

    let got = queue.get(&cancel).await.unwrap();
    assert_eq!(got.name, "a");
    assert_eq!(queue.len(), 0);

    queue.done(&got);
    assert_eq!(queue.len(), 0);
}

#[tokio::test]
async fn adding_same_identity_replaces_payload() {
    let queue = WorkQueue::new();
    let cancel = CancellationToken::new();

    queue.add(req("a"));
    let newer = req("a").retry("boom");
    queue.add(newer.clone());
    assert_eq!(queue.len(), 1);

    let got = queue.get(&cancel).await.unwrap();
    assert_eq!(got, newer);
    assert!(queue.get(&CancellationToken::new()).now_or_never_none());
}

// get() on an empty queue must not resolve; poll it once via a zero timeout.
trait NowOrNever {
    fn now_or_never_none(self) -> bool;
}

impl<F: std::future::Future<Output = Option<ReconcileRequest>>> NowOrNever for F {
    fn now_or_never_none(self) -> bool {
        futures_util::FutureExt::now_or_never(self).is_none()
    }
}

#[tokio::test]
async fn fifo_across_identities() {
    let queue = WorkQueue::new();
    let cancel = CancellationToken::new();

    queue.add(req("a"));
    queue.add(req("b"));
    queue.add(req("c"));

    assert_eq!(queue.get(&cancel).await.unwrap().name, "a");
    assert_eq!(queue.get(&cancel).await.unwrap().name, "b");
    assert_eq!(queue.get(&cancel).await.unwrap().name, "c");
}

#[tokio::test]
async fn add_while_processing_goes_dirty_and_requeues_once() {
    let queue = WorkQueue::new();
    let cancel = CancellationToken::new();

    queue.add(req("a"));
    let in_flight = queue.get(&cancel).await.unwrap();

    // Superseding adds while processing do not enqueue...
    let latest = req("a").retry("second");
    queue.add(req("a").retry("first"));
    queue.add(latest.clone());
    assert_eq!(queue.len(), 0);

    // ...but exactly one (the latest) re-enqueues on done.
    queue.done(&in_flight);
    assert_eq!(queue.len(), 1);
    let got = queue.get(&cancel).await.unwrap();
    assert_eq!(got, latest);

    // The dirty slot was consumed: another done changes nothing.
    queue.done(&got);
    assert_eq!(queue.len(), 0);
}

#[tokio::test]
async fn done_without_get_is_a_no_op() {
    let queue = WorkQueue::new();
    queue.done(&req("ghost"));
    assert_eq!(queue.len(), 0);

    // An identity merely queued (not processing) is unaffected by done.
    queue.add(req("a"));
    queue.done(&req("a"));
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn add_after_shutdown_is_dropped() {
    let queue = WorkQueue::new();
    queue.shutdown();
    queue.add(req("late"));
    assert_eq!(queue.len(), 0);
    assert!(queue.get(&CancellationToken::new()).await.is_none());
}

#[tokio::test]
async fn shutdown_is_idempotent_and_drains() {
    let queue = WorkQueue::new();
    queue.add(req("a"));
    queue.add(req("b"));
    queue.shutdown();
    queue.shutdown();

    let cancel = CancellationToken::new();
    assert_eq!(queue.get(&cancel).await.unwrap().name, "a");
    assert_eq!(queue.get(&cancel).await.unwrap().name, "b");
    assert!(queue.get(&cancel).await.is_none());
}

#[tokio::test]
async fn shutdown_unblocks_every_waiter() {
    let queue = Arc::new(WorkQueue::new());
    let cancel = CancellationToken::new();

    let mut waiters = Vec::new();
    for _ in 0..4 {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        waiters.push(tokio::spawn(async move { queue.get(&cancel).await }));
    }
    // Give the waiters a chance to block.
    tokio::task::yield_now().await;

    queue.shutdown();
    for waiter in waiters {
        let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert_eq!(result.unwrap().unwrap(), None);
    }
}

#[tokio::test]
async fn cancellation_unblocks_waiters() {
    let queue = Arc::new(WorkQueue::new());
    let cancel = CancellationToken::new();

    let waiter = {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.get(&cancel).await })
    };
    tokio::task::yield_now().await;

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
    assert_eq!(result.unwrap().unwrap(), None);

    // The queue itself is still usable after a caller cancels.
    queue.add(req("a"));
    assert_eq!(queue.get(&CancellationToken::new()).await.unwrap().name, "a");
}

#[tokio::test]
async fn blocked_get_wakes_on_add() {
    let queue = Arc::new(WorkQueue::new());
    let cancel = CancellationToken::new();

    let waiter = {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.get(&cancel).await })
    };
    tokio::task::yield_now().await;

    queue.add(req("wake"));
    let got = tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    assert_eq!(got.unwrap().name, "wake");
}

mod properties {
    use super::*;
    use futures_util::FutureExt;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Model-checked invariants under random add/get/done workloads:
        /// at most one queued entry per identity, never queued while
        /// processing, dirty entries re-enqueue exactly once, and `len`
        /// always matches the model.
        #[test]
        fn invariants_hold_under_random_workloads(
            ops in proptest::collection::vec((0u8..3, 0u8..5), 1..200),
        ) {
            let queue = WorkQueue::new();
            let cancel = CancellationToken::new();
            let mut in_flight: Vec<ReconcileRequest> = Vec::new();
            let mut queued: HashSet<String> = HashSet::new();
            let mut dirty: HashSet<String> = HashSet::new();

            for (op, name) in ops {
                let name = format!("r{name}");
                match op {
                    0 => {
                        queue.add(req(&name));
                        if in_flight.iter().any(|r| r.name == name) {
                            dirty.insert(name);
                        } else {
                            queued.insert(name);
                        }
                    }
                    1 => match queue.get(&cancel).now_or_never() {
                        Some(Some(got)) => {
                            prop_assert!(!in_flight.iter().any(|r| r.name == got.name));
                            prop_assert!(queued.remove(&got.name));
                            in_flight.push(got);
                        }
                        _ => prop_assert!(queued.is_empty()),
                    },
                    _ => {
                        if !in_flight.is_empty() {
                            let finished = in_flight.remove(0);
                            queue.done(&finished);
                            if dirty.remove(&finished.name) {
                                queued.insert(finished.name);
                            }
                        }
                    }
                }
                prop_assert_eq!(queue.len(), queued.len());
            }
        }
    }
}

#[tokio::test]
async fn one_in_flight_reconciliation_per_identity() {
    let queue = WorkQueue::new();
    let cancel = CancellationToken::new();

    queue.add(req("a"));
    let first = queue.get(&cancel).await.unwrap();

    // A new event for the same identity while in flight must not become
    // concurrently gettable.
    queue.add(req("a"));
    assert!(queue.get(&cancel).now_or_never_none());

    queue.done(&first);
    assert_eq!(queue.get(&cancel).await.unwrap().name, "a");
}
