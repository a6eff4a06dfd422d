//! Per-kind concurrent instance cache
//!
//! Each resource kind owns one cache mapping instance id to the kind-specific
//! attribute record (zone, region, ...). The cache always reflects "resources
//! still requiring action": listing inserts, confirmed shutdown removes.

use std::collections::BTreeMap;
use std::sync::RwLock;

/// Concurrent map from instance id to a kind-specific attribute record.
///
/// Readers (listing, dry-run reporting, dependency checks) and writers
/// (refresh, per-task confirmation deletes) run concurrently; the ordered map
/// underneath makes every snapshot deterministically sorted by id regardless
/// of insertion order.
#[derive(Debug, Default)]
pub struct InstanceCache<P> {
    inner: RwLock<BTreeMap<String, P>>,
}

impl<P: Clone> InstanceCache<P> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    /// Drop the previous contents and install a freshly enumerated set.
    pub fn replace_all(&self, entries: impl IntoIterator<Item = (String, P)>) {
        let mut map = self.inner.write().unwrap();
        *map = entries.into_iter().collect();
    }

    /// Remove one instance, on confirmed shutdown.
    pub fn remove(&self, id: &str) -> Option<P> {
        self.inner.write().unwrap().remove(id)
    }

    /// Sorted instance ids currently requiring action.
    pub fn ids(&self) -> Vec<String> {
        self.inner.read().unwrap().keys().cloned().collect()
    }

    /// Sorted (id, attributes) pairs.
    pub fn snapshot(&self) -> Vec<(String, P)> {
        self.inner
            .read()
            .unwrap()
            .iter()
            .map(|(id, props)| (id.clone(), props.clone()))
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().unwrap().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }
}
