// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use notify::event::{CreateKind, DataChange, RemoveKind};
use serial_test::serial;
use std::time::Duration;
use tokio::time::timeout;

const DEBOUNCE: Duration = Duration::from_millis(50);
const WAIT: Duration = Duration::from_secs(5);

fn all_registered() -> HashSet<ResourceType> {
    ResourceType::ALL.into_iter().collect()
}

fn raw(kind: EventKind, path: &Path) -> notify::Event {
    notify::Event::new(kind).add_path(path.to_path_buf())
}

#[test]
fn classify_create_write_remove() {
    let base = Path::new("/base");
    let registered = all_registered();
    let path = base.join("mcpservers/prom.yaml");

    let events = classify(base, &registered, &raw(EventKind::Create(CreateKind::File), &path));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].op, ChangeOp::Create);
    assert_eq!(events[0].name, "prom");
    assert_eq!(events[0].resource_type, ResourceType::McpServer);
    assert_eq!(events[0].file_path.as_deref(), Some(path.as_path()));

    let events = classify(
        base,
        &registered,
        &raw(EventKind::Modify(ModifyKind::Data(DataChange::Any)), &path),
    );
    assert_eq!(events[0].op, ChangeOp::Update);

    let events = classify(base, &registered, &raw(EventKind::Remove(RemoveKind::File), &path));
    assert_eq!(events[0].op, ChangeOp::Delete);
}

#[test]
fn classify_rename_halves() {
    let base = Path::new("/base");
    let registered = all_registered();
    let from = base.join("workflows/old.yaml");
    let to = base.join("workflows/new.yaml");

    let events = classify(
        base,
        &registered,
        &raw(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &from),
    );
    assert_eq!(events[0].op, ChangeOp::Delete);
    assert_eq!(events[0].name, "old");

    let events = classify(
        base,
        &registered,
        &raw(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &to),
    );
    assert_eq!(events[0].op, ChangeOp::Create);
    assert_eq!(events[0].name, "new");

    let both = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
        .add_path(from.clone())
        .add_path(to.clone());
    let events = classify(base, &registered, &both);
    assert_eq!(events.len(), 2);
    assert_eq!((events[0].op, events[0].name.as_str()), (ChangeOp::Delete, "old"));
    assert_eq!((events[1].op, events[1].name.as_str()), (ChangeOp::Create, "new"));
}

#[test]
fn classify_ignores_foreign_paths() {
    let base = Path::new("/base");
    let registered = all_registered();

    // Wrong extension.
    let path = base.join("mcpservers/readme.md");
    assert!(classify(base, &registered, &raw(EventKind::Create(CreateKind::File), &path))
        .is_empty());

    // Outside any resource directory.
    let path = base.join("prom.yaml");
    assert!(classify(base, &registered, &raw(EventKind::Create(CreateKind::File), &path))
        .is_empty());

    // Nested below a resource directory.
    let path = base.join("mcpservers/sub/prom.yaml");
    assert!(classify(base, &registered, &raw(EventKind::Create(CreateKind::File), &path))
        .is_empty());
}

#[test]
fn classify_drops_unwatched_types() {
    let base = Path::new("/base");
    let mut registered = all_registered();
    registered.remove(&ResourceType::Workflow);

    let path = base.join("workflows/wf.yaml");
    assert!(classify(base, &registered, &raw(EventKind::Create(CreateKind::File), &path))
        .is_empty());
}

#[test]
fn resolve_path_accepts_yaml_case_insensitively() {
    let base = Path::new("/base");
    let registered = all_registered();

    for file in ["a.yaml", "b.yml", "c.YAML", "d.YML"] {
        let path = base.join("serviceclasses").join(file);
        assert!(resolve_path(base, &registered, &path).is_some(), "{file} should resolve");
    }
    assert!(resolve_path(base, &registered, &base.join("serviceclasses/e.json")).is_none());
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn detects_file_creation() {
    let dir = tempfile::tempdir().unwrap();
    let detector = FilesystemDetector::new(dir.path(), DEBOUNCE);
    detector.add_resource_type(ResourceType::McpServer).unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    detector.start(tx).unwrap();

    std::fs::write(dir.path().join("mcpservers/prom.yaml"), "name: prom\n").unwrap();

    let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.resource_type, ResourceType::McpServer);
    assert_eq!(event.name, "prom");
    assert_eq!(event.op, ChangeOp::Create);
    assert_eq!(event.source, ChangeSource::Filesystem);

    detector.stop();
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn rapid_writes_coalesce_into_one_event() {
    let dir = tempfile::tempdir().unwrap();
    let detector = FilesystemDetector::new(dir.path(), Duration::from_millis(200));
    detector.add_resource_type(ResourceType::Workflow).unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    detector.start(tx).unwrap();

    let path = dir.path().join("workflows/w.yaml");
    std::fs::write(&path, "name: w\n").unwrap();
    for i in 0..4 {
        std::fs::write(&path, format!("name: w\nrev: {i}\n")).unwrap();
    }

    let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.op, ChangeOp::Create);

    // The burst produced exactly one coalesced event.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(rx.try_recv().is_err());

    detector.stop();
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn detects_file_removal() {
    let dir = tempfile::tempdir().unwrap();
    let detector = FilesystemDetector::new(dir.path(), DEBOUNCE);
    detector.add_resource_type(ResourceType::ServiceClass).unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    detector.start(tx).unwrap();

    let path = dir.path().join("serviceclasses/postgres.yaml");
    std::fs::write(&path, "name: postgres\n").unwrap();
    let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.op, ChangeOp::Create);

    std::fs::remove_file(&path).unwrap();
    let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.op, ChangeOp::Delete);
    assert_eq!(event.name, "postgres");

    detector.stop();
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn existing_files_surface_as_creates_at_start() {
    let dir = tempfile::tempdir().unwrap();
    let detector = FilesystemDetector::new(dir.path(), DEBOUNCE);
    detector.add_resource_type(ResourceType::McpServer).unwrap();
    detector.add_resource_type(ResourceType::Workflow).unwrap();

    std::fs::write(dir.path().join("mcpservers/prom.yaml"), "name: prom\n").unwrap();
    std::fs::write(dir.path().join("workflows/deploy.yml"), "name: deploy\n").unwrap();
    std::fs::write(dir.path().join("mcpservers/notes.txt"), "ignored\n").unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    detector.start(tx).unwrap();

    let mut seen = Vec::new();
    for _ in 0..2 {
        let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(event.op, ChangeOp::Create);
        seen.push((event.resource_type, event.name));
    }
    seen.sort();
    assert_eq!(
        seen,
        vec![
            (ResourceType::McpServer, "prom".to_string()),
            (ResourceType::Workflow, "deploy".to_string()),
        ]
    );

    // The non-YAML file produced nothing.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());

    detector.stop();
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn events_for_removed_types_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let detector = FilesystemDetector::new(dir.path(), DEBOUNCE);
    detector.add_resource_type(ResourceType::McpServer).unwrap();
    detector.add_resource_type(ResourceType::Workflow).unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    detector.start(tx).unwrap();
    detector.remove_resource_type(ResourceType::Workflow);

    std::fs::write(dir.path().join("workflows/wf.yaml"), "name: wf\n").unwrap();
    std::fs::write(dir.path().join("mcpservers/prom.yaml"), "name: prom\n").unwrap();

    // Only the still-watched type comes through.
    let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.resource_type, ResourceType::McpServer);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());

    detector.stop();
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn start_twice_fails_and_stop_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let detector = FilesystemDetector::new(dir.path(), DEBOUNCE);
    detector.add_resource_type(ResourceType::McpServer).unwrap();

    let (tx, _rx) = mpsc::channel(16);
    detector.start(tx.clone()).unwrap();
    assert!(detector.is_running());
    assert!(matches!(detector.start(tx), Err(DetectorError::AlreadyRunning)));

    detector.stop();
    detector.stop();
    assert!(!detector.is_running());
}
