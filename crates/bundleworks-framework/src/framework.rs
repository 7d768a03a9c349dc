//! The framework instance owning bundles and the service registry

use crate::bundle::Bundle;
use crate::registry::ServiceRegistry;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Symbolic name of bundle 0
pub const SYSTEM_BUNDLE_NAME: &str = "system.bundle";

/// Container for installed bundles sharing one [`ServiceRegistry`]
pub struct Framework {
    registry: Arc<ServiceRegistry>,
    bundles: DashMap<u64, Arc<Bundle>>,
    next_bundle_id: AtomicU64,
}

impl Framework {
    /// Create a framework with only the system bundle installed
    pub fn new() -> Self {
        let registry = ServiceRegistry::new();
        let bundles = DashMap::new();
        let system = Bundle::new(
            0,
            SYSTEM_BUNDLE_NAME,
            serde_json::Value::Null,
            Arc::clone(&registry),
        );
        bundles.insert(0, Arc::new(system));
        Self {
            registry,
            bundles,
            next_bundle_id: AtomicU64::new(1),
        }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn system_bundle(&self) -> Option<Arc<Bundle>> {
        self.get_bundle(0)
    }

    pub fn install_bundle(
        &self,
        symbolic_name: impl Into<String>,
        manifest: serde_json::Value,
    ) -> Arc<Bundle> {
        let id = self.next_bundle_id.fetch_add(1, Ordering::SeqCst);
        let bundle = Arc::new(Bundle::new(
            id,
            symbolic_name,
            manifest,
            Arc::clone(&self.registry),
        ));
        self.bundles.insert(id, Arc::clone(&bundle));
        tracing::info!(bundle_id = id, name = bundle.symbolic_name(), "Bundle installed");
        bundle
    }

    pub fn get_bundle(&self, id: u64) -> Option<Arc<Bundle>> {
        self.bundles.get(&id).map(|bundle| Arc::clone(bundle.value()))
    }

    /// Installed bundles ordered by id
    pub fn bundles(&self) -> Vec<Arc<Bundle>> {
        let mut bundles: Vec<Arc<Bundle>> = self
            .bundles
            .iter()
            .map(|bundle| Arc::clone(bundle.value()))
            .collect();
        bundles.sort_by_key(|bundle| bundle.id());
        bundles
    }

    /// Remove a bundle and withdraw every service it registered
    pub fn uninstall_bundle(&self, id: u64) -> Option<Arc<Bundle>> {
        if id == 0 {
            tracing::warn!("The system bundle cannot be uninstalled");
            return None;
        }
        let (_, bundle) = self.bundles.remove(&id)?;
        let withdrawn = self.registry.unregister_all(id);
        tracing::info!(bundle_id = id, withdrawn, "Bundle uninstalled");
        Some(bundle)
    }
}

impl Default for Framework {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framework")
            .field("bundles", &self.bundles.len())
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
#[path = "framework/framework_tests.rs"]
mod framework_tests;
