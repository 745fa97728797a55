// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem change detection for resource definition directories.
//!
//! Layout under the base path: `mcpservers/`, `serviceclasses/`,
//! `workflows/`. Only `.yaml`/`.yml` files (case-insensitive) count, and
//! the resource name is the file stem. Raw OS notifications are bridged
//! onto the runtime, classified, then debounced per identity before they
//! reach the change channel.

use crate::detector::debounce::Debouncer;
use crate::error::DetectorError;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use steward_core::{ChangeEvent, ChangeOp, ChangeSource, ResourceType};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Subdirectory holding definitions for a resource type.
pub(crate) fn dir_name(rt: ResourceType) -> &'static str {
    match rt {
        ResourceType::McpServer => "mcpservers",
        ResourceType::ServiceClass => "serviceclasses",
        ResourceType::Workflow => "workflows",
    }
}

/// Watches resource definition directories and emits change events.
pub struct FilesystemDetector {
    base_dir: PathBuf,
    debounce_interval: Duration,
    resource_types: Arc<RwLock<HashSet<ResourceType>>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
    debouncer: Mutex<Option<Arc<Debouncer>>>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl FilesystemDetector {
    pub fn new(base_dir: impl Into<PathBuf>, debounce_interval: Duration) -> Self {
        Self {
            base_dir: base_dir.into(),
            debounce_interval,
            resource_types: Arc::new(RwLock::new(HashSet::new())),
            watcher: Mutex::new(None),
            debouncer: Mutex::new(None),
            cancel: Mutex::new(None),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn dir_for(&self, rt: ResourceType) -> PathBuf {
        self.base_dir.join(dir_name(rt))
    }

    /// Register a type: ensure its directory exists and, when running,
    /// add an OS watch for it.
    pub fn add_resource_type(&self, rt: ResourceType) -> Result<(), DetectorError> {
        let dir = self.dir_for(rt);
        std::fs::create_dir_all(&dir)?;
        self.resource_types.write().insert(rt);
        if let Some(watcher) = self.watcher.lock().as_mut() {
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        }
        Ok(())
    }

    /// Unregister a type. The OS watch may remain; events for unwatched
    /// types are dropped in the processing loop.
    pub fn remove_resource_type(&self, rt: ResourceType) {
        self.resource_types.write().remove(&rt);
    }

    pub fn is_running(&self) -> bool {
        self.cancel.lock().is_some()
    }

    /// Open the OS watcher, add watches for every registered type and
    /// start the processing loop feeding `tx`.
    pub fn start(&self, tx: mpsc::Sender<ChangeEvent>) -> Result<(), DetectorError> {
        let mut cancel_guard = self.cancel.lock();
        if cancel_guard.is_some() {
            return Err(DetectorError::AlreadyRunning);
        }

        // Raw OS notifications arrive on the watcher's own thread;
        // blocking_send bridges them onto the runtime.
        let (raw_tx, mut raw_rx) = mpsc::channel::<notify::Event>(256);
        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        let _ = raw_tx.blocking_send(event);
                    }
                    Err(err) => tracing::warn!(error = %err, "filesystem watch error"),
                }
            })?;

        for rt in self.resource_types.read().iter() {
            watcher.watch(&self.dir_for(*rt), RecursiveMode::NonRecursive)?;
        }

        let debouncer = Arc::new(Debouncer::new(self.debounce_interval, tx));
        let cancel = CancellationToken::new();

        // Definitions that existed before the watch began still need a
        // first reconcile; surface them as creates through the same
        // debounce path so watcher races coalesce.
        for rt in self.resource_types.read().iter() {
            for event in scan_existing(&self.base_dir, *rt) {
                debouncer.observe(event);
            }
        }

        let loop_cancel = cancel.clone();
        let loop_debouncer = Arc::clone(&debouncer);
        let registered = Arc::clone(&self.resource_types);
        let base_dir = self.base_dir.clone();
        tokio::spawn(async move {
            loop {
                let raw = tokio::select! {
                    _ = loop_cancel.cancelled() => break,
                    raw = raw_rx.recv() => match raw {
                        Some(raw) => raw,
                        None => break,
                    },
                };
                let events = classify(&base_dir, &registered.read(), &raw);
                for event in events {
                    loop_debouncer.observe(event);
                }
            }
            tracing::debug!("filesystem detector loop stopped");
        });

        *self.watcher.lock() = Some(watcher);
        *self.debouncer.lock() = Some(debouncer);
        *cancel_guard = Some(cancel);
        tracing::info!(base_dir = %self.base_dir.display(), "filesystem detector started");
        Ok(())
    }

    /// Close the OS watcher and cancel pending debounce timers. Idempotent.
    pub fn stop(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel.cancel();
        }
        // Dropping the watcher releases the OS watches.
        *self.watcher.lock() = None;
        if let Some(debouncer) = self.debouncer.lock().take() {
            debouncer.cancel_all();
        }
    }
}

/// Create events for the YAML files already present in a type's
/// directory.
fn scan_existing(base_dir: &Path, rt: ResourceType) -> Vec<ChangeEvent> {
    let registered = HashSet::from([rt]);
    let dir = base_dir.join(dir_name(rt));
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "initial scan failed");
            return Vec::new();
        }
    };
    entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let (rt, name) = resolve_path(base_dir, &registered, &path)?;
            Some(
                ChangeEvent::new(rt, name, ChangeOp::Create, ChangeSource::Filesystem)
                    .with_file_path(path),
            )
        })
        .collect()
}

/// Map one raw notification to zero or more change events, dropping
/// paths outside watched resource directories and non-YAML files.
fn classify(
    base_dir: &Path,
    registered: &HashSet<ResourceType>,
    raw: &notify::Event,
) -> Vec<ChangeEvent> {
    let per_path: Vec<ChangeOp> = match &raw.kind {
        EventKind::Create(_) => vec![ChangeOp::Create; raw.paths.len()],
        EventKind::Remove(_) => vec![ChangeOp::Delete; raw.paths.len()],
        EventKind::Modify(ModifyKind::Name(mode)) => rename_ops(*mode, raw.paths.len()),
        EventKind::Modify(_) | EventKind::Any => vec![ChangeOp::Update; raw.paths.len()],
        EventKind::Access(_) | EventKind::Other => Vec::new(),
    };

    raw.paths
        .iter()
        .zip(per_path)
        .filter_map(|(path, op)| {
            let (rt, name) = resolve_path(base_dir, registered, path)?;
            Some(
                ChangeEvent::new(rt, name, op, ChangeSource::Filesystem)
                    .with_file_path(path.clone()),
            )
        })
        .collect()
}

/// Operations for the paths of a rename notification.
///
/// The source half is a delete; the destination half synthesizes a
/// create, covering platforms that never report a separate create for
/// the new name.
fn rename_ops(mode: RenameMode, paths: usize) -> Vec<ChangeOp> {
    match mode {
        RenameMode::From => vec![ChangeOp::Delete; paths],
        RenameMode::To => vec![ChangeOp::Create; paths],
        // Both carries [from, to].
        RenameMode::Both if paths == 2 => vec![ChangeOp::Delete, ChangeOp::Create],
        _ => vec![ChangeOp::Delete; paths],
    }
}

/// Resolve a path to `(type, name)` when it is a YAML file directly under
/// a watched resource directory.
fn resolve_path(
    base_dir: &Path,
    registered: &HashSet<ResourceType>,
    path: &Path,
) -> Option<(ResourceType, String)> {
    let extension = path.extension()?.to_str()?;
    if !extension.eq_ignore_ascii_case("yaml") && !extension.eq_ignore_ascii_case("yml") {
        return None;
    }
    let parent = path.parent()?;
    let rt = ResourceType::ALL
        .into_iter()
        .find(|rt| registered.contains(rt) && parent == base_dir.join(dir_name(*rt)))?;
    let name = path.file_stem()?.to_str()?;
    if name.is_empty() {
        return None;
    }
    Some((rt, name.to_string()))
}

#[cfg(test)]
#[path = "filesystem_tests.rs"]
mod tests;
