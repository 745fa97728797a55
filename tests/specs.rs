// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios for the steward reconciliation engine, driven
//! through public APIs with fake collaborators.

#[path = "specs/support.rs"]
mod support;

#[path = "specs/create_propagation.rs"]
mod create_propagation;

#[path = "specs/debounce.rs"]
mod debounce;

#[path = "specs/disabled.rs"]
mod disabled;

#[path = "specs/retry.rs"]
mod retry;

#[path = "specs/status_conflict.rs"]
mod status_conflict;
