//! The capability contract resource kinds implement, and the registry
//! holding every known kind
//!
//! Kinds are registered explicitly at startup; there is no global mutable
//! registration, so tests can assemble whatever kind set they need.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::RunConfig;
use crate::error::{RunError, ShutdownError};
use crate::provider::ProviderError;

/// Uniform contract every resource kind implements.
///
/// The orchestrator stays generic over this trait and never branches on a
/// concrete kind.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Stable identifier used in logs and dependency declarations.
    fn name(&self) -> &'static str;

    /// Inject the shared run configuration. Called exactly once, by
    /// [`Registry::setup_all`], before any other operation.
    fn setup(&mut self, config: Arc<RunConfig>);

    /// Instance ids for this kind, sorted.
    ///
    /// With `refresh = false` this is a cache snapshot and contacts no
    /// provider; with `refresh = true` it performs a full enumeration and
    /// replaces the cache. Enumeration excludes instances owned by a
    /// higher-level controller; those are never targeted.
    async fn list(&self, refresh: bool) -> Result<Vec<String>, ProviderError>;

    /// Kinds that must reach an empty cache before this kind is eligible.
    fn dependencies(&self) -> &[&'static str] {
        &[]
    }

    /// Bring every cached instance to a terminal state; first failure wins.
    async fn shutdown(&self) -> Result<(), ShutdownError>;
}

/// All known resource kinds, keyed by name.
///
/// Append-only during startup. Iteration is name-ordered so logs and tests
/// are stable, but shutdown correctness never depends on it; ordering comes
/// from [`crate::deps::resolve_order`].
#[derive(Default)]
pub struct Registry {
    kinds: BTreeMap<&'static str, Box<dyn Resource>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            kinds: BTreeMap::new(),
        }
    }

    /// Add a kind. Registering two kinds under one name is a startup error.
    pub fn register(&mut self, resource: Box<dyn Resource>) -> Result<(), RunError> {
        let name = resource.name();
        if self.kinds.contains_key(name) {
            return Err(RunError::DuplicateKind { name: name.into() });
        }
        self.kinds.insert(name, resource);
        Ok(())
    }

    /// Run every kind's `setup` with the shared configuration.
    pub fn setup_all(&mut self, config: Arc<RunConfig>) {
        for resource in self.kinds.values_mut() {
            resource.setup(config.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Resource> {
        self.kinds.get(name).map(|r| r.as_ref())
    }

    /// Registered kind names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.kinds.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Resource> {
        self.kinds.values().map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
