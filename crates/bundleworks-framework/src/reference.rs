//! Handles to registered services

use bundleworks_core::Properties;
use bundleworks_core::properties::{OBJECTCLASS, ranking};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Snapshot of a registered service's identity and properties
///
/// References order best first: a higher `service.ranking` wins, and on
/// equal ranking the lower (older) `service.id` wins. Equality and hashing
/// follow the same `(ranking, id)` key, so a reference whose ranking was
/// changed compares unequal to its previous snapshot.
#[derive(Clone)]
pub struct ServiceReference {
    inner: Arc<ReferenceInner>,
}

struct ReferenceInner {
    id: u64,
    bundle_id: u64,
    ranking: i64,
    properties: Properties,
}

impl ServiceReference {
    pub(crate) fn new(id: u64, bundle_id: u64, properties: Properties) -> Self {
        Self {
            inner: Arc::new(ReferenceInner {
                id,
                bundle_id,
                ranking: ranking(&properties),
                properties,
            }),
        }
    }

    /// Framework-assigned service id
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Id of the bundle that registered the service
    pub fn bundle_id(&self) -> u64 {
        self.inner.bundle_id
    }

    pub fn ranking(&self) -> i64 {
        self.inner.ranking
    }

    pub fn properties(&self) -> &Properties {
        &self.inner.properties
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.inner.properties.get(key)
    }

    /// Interfaces the service was registered under
    pub fn interfaces(&self) -> Vec<&str> {
        match self.property(OBJECTCLASS) {
            Some(serde_json::Value::Array(items)) => {
                items.iter().filter_map(serde_json::Value::as_str).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn has_interface(&self, interface: &str) -> bool {
        self.interfaces().contains(&interface)
    }

    /// Whether this reference would be chosen over `other`
    pub fn is_better_than(&self, other: &ServiceReference) -> bool {
        self.cmp(other) == Ordering::Less
    }

    fn key(&self) -> (std::cmp::Reverse<i64>, u64) {
        (std::cmp::Reverse(self.inner.ranking), self.inner.id)
    }
}

impl PartialEq for ServiceReference {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ServiceReference {}

impl Hash for ServiceReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for ServiceReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServiceReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl std::fmt::Debug for ServiceReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceReference")
            .field("id", &self.inner.id)
            .field("ranking", &self.inner.ranking)
            .field("bundle_id", &self.inner.bundle_id)
            .finish()
    }
}

#[cfg(test)]
#[path = "reference/reference_tests.rs"]
mod reference_tests;
