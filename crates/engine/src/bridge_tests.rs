// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use steward_core::HealthState;

struct RecordingSink {
    events: Mutex<Vec<ChangeEvent>>,
    reject: Option<ResourceType>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self { events: Mutex::new(Vec::new()), reject: None })
    }

    fn rejecting(rt: ResourceType) -> Arc<Self> {
        Arc::new(Self { events: Mutex::new(Vec::new()), reject: Some(rt) })
    }

    fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().clone()
    }
}

impl ChangeSink for RecordingSink {
    fn submit(&self, event: ChangeEvent) {
        self.events.lock().push(event);
    }

    fn accepts(&self, resource_type: ResourceType) -> bool {
        self.reject != Some(resource_type)
    }
}

fn change(name: &str, service_type: &str) -> ServiceStateChange {
    ServiceStateChange {
        name: name.to_string(),
        service_type: service_type.to_string(),
        old_state: "starting".to_string(),
        new_state: "running".to_string(),
        health: HealthState::Healthy,
    }
}

async fn drain(bridge: &StateChangeBridge) {
    // Let the bridge task consume whatever is buffered.
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    let _ = bridge;
}

#[tokio::test]
async fn mcp_server_state_changes_become_update_events() {
    let sink = RecordingSink::new();
    let bridge = StateChangeBridge::new();
    let (tx, rx) = mpsc::channel(8);
    bridge.start(rx, Arc::<RecordingSink>::clone(&sink));

    tx.send(change("prom", "MCPServer")).await.unwrap();
    drain(&bridge).await;

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].resource_type, ResourceType::McpServer);
    assert_eq!(events[0].name, "prom");
    assert_eq!(events[0].op, ChangeOp::Update);
    assert_eq!(events[0].source, ChangeSource::ServiceState);

    bridge.stop();
}

#[tokio::test]
async fn unmapped_service_types_are_ignored() {
    let sink = RecordingSink::new();
    let bridge = StateChangeBridge::new();
    let (tx, rx) = mpsc::channel(8);
    bridge.start(rx, Arc::<RecordingSink>::clone(&sink));

    tx.send(change("db", "ServiceClassInstance")).await.unwrap();
    tx.send(change("prom", "MCPServer")).await.unwrap();
    drain(&bridge).await;

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "prom");

    bridge.stop();
}

#[tokio::test]
async fn disabled_types_are_dropped() {
    let sink = RecordingSink::rejecting(ResourceType::McpServer);
    let bridge = StateChangeBridge::new();
    let (tx, rx) = mpsc::channel(8);
    bridge.start(rx, Arc::<RecordingSink>::clone(&sink));

    tx.send(change("prom", "MCPServer")).await.unwrap();
    drain(&bridge).await;
    assert!(sink.events().is_empty());

    bridge.stop();
}

#[tokio::test]
async fn closed_subscription_marks_bridge_not_running() {
    let sink = RecordingSink::new();
    let bridge = StateChangeBridge::new();
    let (tx, rx) = mpsc::channel(8);
    bridge.start(rx, Arc::<RecordingSink>::clone(&sink));
    assert!(bridge.is_running());

    drop(tx);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while bridge.is_running() && tokio::time::Instant::now() < deadline {
        tokio::task::yield_now().await;
    }
    assert!(!bridge.is_running());
}
