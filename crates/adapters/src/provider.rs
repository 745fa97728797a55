// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desired-state providers.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a resource provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The definition does not exist. The reconcilers interpret this as
    /// a delete, never as a failure.
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("provider failed: {0}")]
    Failed(String),
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}

/// Source of desired state for one resource type.
///
/// `S` is the spec document the provider serves (`McpServerSpec`,
/// `ServiceClassSpec` or `WorkflowSpec`).
#[async_trait]
pub trait ResourceProvider<S>: Send + Sync {
    /// Fetch the desired spec by identity.
    async fn get_spec(&self, namespace: &str, name: &str) -> Result<S, ProviderError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{ProviderError, ResourceProvider};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// In-memory provider for testing.
    #[derive(Clone)]
    pub struct FakeProvider<S> {
        inner: Arc<Mutex<FakeProviderState<S>>>,
    }

    struct FakeProviderState<S> {
        specs: HashMap<(String, String), S>,
        error: Option<ProviderError>,
    }

    impl<S: Clone> Default for FakeProvider<S> {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeProviderState {
                    specs: HashMap::new(),
                    error: None,
                })),
            }
        }
    }

    impl<S: Clone> FakeProvider<S> {
        pub fn new() -> Self {
            Self::default()
        }

        /// Insert or replace a spec.
        pub fn insert(&self, namespace: &str, name: &str, spec: S) {
            self.inner.lock().specs.insert((namespace.to_string(), name.to_string()), spec);
        }

        /// Remove a spec; subsequent fetches report not-found.
        pub fn remove(&self, namespace: &str, name: &str) {
            self.inner.lock().specs.remove(&(namespace.to_string(), name.to_string()));
        }

        /// Make every fetch fail with the given error until cleared.
        pub fn fail_with(&self, error: ProviderError) {
            self.inner.lock().error = Some(error);
        }

        pub fn clear_failure(&self) {
            self.inner.lock().error = None;
        }
    }

    #[async_trait]
    impl<S: Clone + Send + Sync> ResourceProvider<S> for FakeProvider<S> {
        async fn get_spec(&self, namespace: &str, name: &str) -> Result<S, ProviderError> {
            let state = self.inner.lock();
            if let Some(err) = &state.error {
                return Err(err.clone());
            }
            state
                .specs
                .get(&(namespace.to_string(), name.to_string()))
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(format!("{namespace}/{name}")))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProvider;

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
