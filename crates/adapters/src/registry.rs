// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running-service registry interface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use steward_core::{HealthState, McpServerSpec};
use thiserror::Error;

/// Errors from registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The service does not accept in-place configuration updates.
    #[error("service not configurable: {0}")]
    NotConfigurable(String),
    #[error("registry failed: {0}")]
    Failed(String),
}

/// Snapshot of a running service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub state: String,
    pub health: HealthState,
    pub last_error: Option<String>,
    /// Free-form configuration mapping used for drift detection. Keys at
    /// minimum: url, command, type, autoStart, args, env, headers,
    /// timeout, toolPrefix, auth. Values may be strongly or weakly typed.
    pub data: Map<String, Value>,
}

/// Read access to running services plus the in-place configuration
/// update hook applied before a restart.
pub trait ServiceRegistry: Send + Sync {
    fn get(&self, name: &str) -> Option<ServiceInfo>;

    /// Replace the stored configuration of a configurable service with
    /// the desired spec.
    fn update_config(&self, name: &str, spec: &McpServerSpec) -> Result<(), RegistryError>;
}

/// Configuration mapping mirroring `spec`, as a registry stores it.
pub fn config_data_for(spec: &McpServerSpec) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("type".into(), Value::String(spec.server_type.clone()));
    data.insert("autoStart".into(), Value::Bool(spec.auto_start));
    if let Some(url) = &spec.url {
        data.insert("url".into(), Value::String(url.clone()));
    }
    if let Some(command) = &spec.command {
        data.insert("command".into(), Value::String(command.clone()));
    }
    if !spec.args.is_empty() {
        data.insert(
            "args".into(),
            Value::Array(spec.args.iter().map(|a| Value::String(a.clone())).collect()),
        );
    }
    if !spec.env.is_empty() {
        data.insert(
            "env".into(),
            Value::Object(
                spec.env.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect(),
            ),
        );
    }
    if !spec.headers.is_empty() {
        data.insert(
            "headers".into(),
            Value::Object(
                spec.headers.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect(),
            ),
        );
    }
    if let Some(timeout) = spec.timeout {
        data.insert("timeout".into(), Value::from(timeout));
    }
    if let Some(prefix) = &spec.tool_prefix {
        data.insert("toolPrefix".into(), Value::String(prefix.clone()));
    }
    if let Some(auth) = &spec.auth {
        data.insert("auth".into(), auth.clone());
    }
    data
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{config_data_for, RegistryError, ServiceInfo, ServiceRegistry};
    use parking_lot::Mutex;
    use steward_core::McpServerSpec;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// A running service whose stored configuration mirrors `spec`.
    pub fn service_info_for(spec: &McpServerSpec) -> ServiceInfo {
        ServiceInfo { state: "running".to_string(), data: config_data_for(spec), ..Default::default() }
    }

    #[derive(Default)]
    struct FakeRegistryState {
        services: HashMap<String, ServiceInfo>,
        config_updates: Vec<(String, McpServerSpec)>,
        update_error: Option<RegistryError>,
    }

    /// In-memory registry for testing.
    #[derive(Clone, Default)]
    pub struct FakeRegistry {
        inner: Arc<Mutex<FakeRegistryState>>,
    }

    impl FakeRegistry {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, name: &str, info: ServiceInfo) {
            self.inner.lock().services.insert(name.to_string(), info);
        }

        pub fn remove(&self, name: &str) {
            self.inner.lock().services.remove(name);
        }

        /// Recorded in-place configuration updates, in order.
        pub fn config_updates(&self) -> Vec<(String, McpServerSpec)> {
            self.inner.lock().config_updates.clone()
        }

        pub fn set_update_error(&self, error: Option<RegistryError>) {
            self.inner.lock().update_error = error;
        }
    }

    impl ServiceRegistry for FakeRegistry {
        fn get(&self, name: &str) -> Option<ServiceInfo> {
            self.inner.lock().services.get(name).cloned()
        }

        fn update_config(&self, name: &str, spec: &McpServerSpec) -> Result<(), RegistryError> {
            let mut state = self.inner.lock();
            if let Some(err) = &state.update_error {
                return Err(err.clone());
            }
            state.config_updates.push((name.to_string(), spec.clone()));
            if let Some(info) = state.services.get_mut(name) {
                info.data = config_data_for(spec);
            }
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{service_info_for, FakeRegistry};
