//! Installed bundles and their view of the framework

use crate::ldap::LdapFilter;
use crate::reference::ServiceReference;
use crate::registry::{
    ServiceListener, ServiceObject, ServiceRegistration, ServiceRegistry, ServiceSource,
};
use bundleworks_core::{FrameworkError, FrameworkResult, Properties, ScrManifest};
use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;

/// Manifest key holding the declarative component descriptions
pub const SCR_MANIFEST_KEY: &str = "scr";

/// An exported symbol of a bundle
pub type Symbol = Arc<dyn Any + Send + Sync>;

/// A unit of deployment
///
/// The symbol table stands in for the shared library a bundle would load:
/// component implementations are looked up by name at activation time.
pub struct Bundle {
    id: u64,
    symbolic_name: String,
    manifest: serde_json::Value,
    symbols: DashMap<String, Symbol>,
    registry: Arc<ServiceRegistry>,
}

impl Bundle {
    pub(crate) fn new(
        id: u64,
        symbolic_name: impl Into<String>,
        manifest: serde_json::Value,
        registry: Arc<ServiceRegistry>,
    ) -> Self {
        Self {
            id,
            symbolic_name: symbolic_name.into(),
            manifest,
            symbols: DashMap::new(),
            registry,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn symbolic_name(&self) -> &str {
        &self.symbolic_name
    }

    pub fn manifest(&self) -> &serde_json::Value {
        &self.manifest
    }

    /// Parsed `scr` section of the manifest, if the bundle has one
    pub fn scr_manifest(&self) -> FrameworkResult<Option<ScrManifest>> {
        match self.manifest.get(SCR_MANIFEST_KEY) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(section) => ScrManifest::from_value(section.clone()).map(Some),
        }
    }

    pub fn export_symbol(&self, name: impl Into<String>, symbol: Symbol) {
        self.symbols.insert(name.into(), symbol);
    }

    /// Look up an exported symbol
    ///
    /// # Errors
    ///
    /// [`FrameworkError::SharedLibrary`] when the bundle does not export `name`.
    pub fn lookup_symbol(&self, name: &str) -> FrameworkResult<Symbol> {
        self.symbols
            .get(name)
            .map(|symbol| Arc::clone(symbol.value()))
            .ok_or_else(|| {
                FrameworkError::SharedLibrary(format!(
                    "bundle '{}' does not export symbol '{name}'",
                    self.symbolic_name
                ))
            })
    }

    pub fn context(self: &Arc<Self>) -> BundleContext {
        BundleContext {
            bundle: Arc::clone(self),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl std::fmt::Debug for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundle")
            .field("id", &self.id)
            .field("symbolic_name", &self.symbolic_name)
            .finish()
    }
}

/// A bundle's handle on the framework's service layer
#[derive(Clone, Debug)]
pub struct BundleContext {
    bundle: Arc<Bundle>,
    registry: Arc<ServiceRegistry>,
}

impl BundleContext {
    pub fn bundle(&self) -> &Arc<Bundle> {
        &self.bundle
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn register_service(
        &self,
        interfaces: &[String],
        source: ServiceSource,
        properties: Properties,
    ) -> FrameworkResult<ServiceRegistration> {
        self.registry
            .register(self.bundle.id, interfaces, source, properties)
    }

    /// Like [`BundleContext::register_service`], with a hook that runs
    /// before service listeners are notified
    pub fn register_service_with<F>(
        &self,
        interfaces: &[String],
        source: ServiceSource,
        properties: Properties,
        on_registered: F,
    ) -> FrameworkResult<ServiceRegistration>
    where
        F: FnOnce(&ServiceRegistration),
    {
        self.registry
            .register_with(self.bundle.id, interfaces, source, properties, on_registered)
    }

    /// References to `interface` services matching an optional LDAP `filter`, best first
    pub fn get_service_references(
        &self,
        interface: &str,
        filter: Option<&str>,
    ) -> FrameworkResult<Vec<ServiceReference>> {
        let filter = filter.map(LdapFilter::parse).transpose()?;
        Ok(self.registry.find(interface, filter.as_ref()))
    }

    pub fn get_service_reference(&self, interface: &str) -> Option<ServiceReference> {
        self.registry.find(interface, None).into_iter().next()
    }

    pub fn get_service(&self, reference: &ServiceReference) -> FrameworkResult<Option<ServiceObject>> {
        self.registry.get_service(self.bundle.id, reference)
    }

    pub fn unget_service(&self, reference: &ServiceReference) -> bool {
        self.registry.unget_service(self.bundle.id, reference)
    }

    pub fn add_service_listener(
        &self,
        filter: Option<&str>,
        listener: ServiceListener,
    ) -> FrameworkResult<u64> {
        let filter = filter.map(LdapFilter::parse).transpose()?;
        Ok(self.registry.add_listener(filter, listener))
    }

    pub fn remove_service_listener(&self, token: u64) -> bool {
        self.registry.remove_listener(token)
    }
}
