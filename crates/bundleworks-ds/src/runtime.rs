//! Entry point tying bundles to the component runtime

use crate::component_registry::ComponentRegistry;
use crate::config_admin::ConfigurationNotifier;
use crate::extension::BundleExtension;
use crate::scr::ServiceComponentRuntime;
use bundleworks_core::{FrameworkResult, LogLevel};
use bundleworks_framework::Bundle;
use bundleworks_logging::Logger;
use bundleworks_runtime::AsyncWorkService;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// The declarative services runtime
///
/// Call [`DeclarativeServices::bundle_started`] when a bundle starts and
/// [`DeclarativeServices::bundle_stopping`] before it stops. Bundles whose
/// manifest has an `scr` section get a [`BundleExtension`].
pub struct DeclarativeServices {
    registry: Arc<ComponentRegistry>,
    extensions: DashMap<u64, BundleExtension>,
    logger: Arc<dyn Logger>,
    work: Arc<dyn AsyncWorkService>,
}

impl DeclarativeServices {
    pub fn new(logger: Arc<dyn Logger>, work: Arc<dyn AsyncWorkService>) -> Self {
        Self {
            registry: ComponentRegistry::new(),
            extensions: DashMap::new(),
            logger,
            work,
        }
    }

    /// Set up the components `bundle` declares
    ///
    /// Returns `false` for bundles without components and bundles that are
    /// already tracked.
    ///
    /// # Errors
    ///
    /// Manifest parse errors and
    /// [`bundleworks_core::FrameworkError::SharedLibrary`] from immediate
    /// components whose implementation is missing.
    pub fn bundle_started(&self, bundle: &Arc<Bundle>) -> FrameworkResult<bool> {
        let Some(manifest) = bundle.scr_manifest()? else {
            return Ok(false);
        };
        if self.extensions.contains_key(&bundle.id()) {
            return Ok(false);
        }

        let extension = BundleExtension::new(
            Arc::clone(bundle),
            &manifest,
            Arc::clone(&self.registry),
            Arc::clone(&self.logger),
            Arc::clone(&self.work),
        )?;

        let rejected = match self.extensions.entry(bundle.id()) {
            Entry::Occupied(_) => Some(extension),
            Entry::Vacant(slot) => {
                slot.insert(extension);
                None
            }
        };
        if rejected.is_some() {
            self.logger.log(
                LogLevel::Warn,
                &format!(
                    "Bundle '{}' was started twice concurrently",
                    bundle.symbolic_name()
                ),
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Tear down the components of a stopping bundle
    pub fn bundle_stopping(&self, bundle_id: u64) -> bool {
        let removed = self.extensions.remove(&bundle_id);
        removed.is_some()
    }

    pub fn component_registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// Store of configuration data; updates reach dependent components
    /// synchronously
    pub fn configuration_notifier(&self) -> &Arc<ConfigurationNotifier> {
        self.registry.configuration_notifier()
    }

    pub fn service_component_runtime(&self) -> ServiceComponentRuntime {
        ServiceComponentRuntime::new(Arc::clone(&self.registry))
    }
}

impl Drop for DeclarativeServices {
    fn drop(&mut self) {
        let bundles: Vec<u64> = self.extensions.iter().map(|e| *e.key()).collect();
        for bundle_id in bundles {
            self.bundle_stopping(bundle_id);
        }
    }
}

impl std::fmt::Debug for DeclarativeServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeclarativeServices")
            .field("bundles", &self.extensions.len())
            .field("components", &self.registry.len())
            .finish()
    }
}
