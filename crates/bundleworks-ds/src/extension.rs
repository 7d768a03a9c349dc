//! Per-bundle component management

use crate::component_registry::ComponentRegistry;
use crate::manager::ComponentManager;
use bundleworks_core::{FrameworkResult, LogLevel, ScrManifest};
use bundleworks_framework::Bundle;
use bundleworks_logging::Logger;
use bundleworks_runtime::AsyncWorkService;
use std::sync::Arc;

/// The components one started bundle declares
///
/// Creating the extension creates, registers and initializes a manager per
/// component description. Dropping it disables them and removes them from
/// the registry, waiting for the teardown to finish.
pub struct BundleExtension {
    bundle: Arc<Bundle>,
    registry: Arc<ComponentRegistry>,
    logger: Arc<dyn Logger>,
    managers: Vec<Arc<ComponentManager>>,
}

impl BundleExtension {
    /// # Errors
    ///
    /// [`bundleworks_core::FrameworkError::SharedLibrary`] when an immediate component's
    /// implementation cannot be loaded. Components already set up are torn
    /// down again. Any other per-component failure is logged and that
    /// component is skipped.
    pub fn new(
        bundle: Arc<Bundle>,
        manifest: &ScrManifest,
        registry: Arc<ComponentRegistry>,
        logger: Arc<dyn Logger>,
        work: Arc<dyn AsyncWorkService>,
    ) -> FrameworkResult<Self> {
        let mut extension = Self {
            bundle,
            registry,
            logger,
            managers: Vec::new(),
        };

        for metadata in &manifest.components {
            let manager = match ComponentManager::new(
                Arc::new(metadata.clone()),
                Arc::clone(&extension.bundle),
                &extension.registry,
                Arc::clone(&extension.logger),
                Arc::clone(&work),
            ) {
                Ok(manager) => Arc::new(manager),
                Err(err) => {
                    extension.logger.log_error(
                        LogLevel::Error,
                        &format!("Skipping invalid component '{}'", metadata.name),
                        &err,
                    );
                    continue;
                }
            };

            if !extension
                .registry
                .add_component_manager(Arc::clone(&manager))
            {
                extension.logger.log(
                    LogLevel::Warn,
                    &format!(
                        "Bundle '{}' declares component '{}' more than once",
                        extension.bundle.symbolic_name(),
                        metadata.name
                    ),
                );
                continue;
            }
            extension.managers.push(Arc::clone(&manager));

            // on error, dropping the extension tears down what was set up so far
            manager.initialize()?;
        }

        extension.logger.log(
            LogLevel::Info,
            &format!(
                "Bundle '{}' provides {} component(s)",
                extension.bundle.symbolic_name(),
                extension.managers.len()
            ),
        );
        Ok(extension)
    }

    pub fn bundle(&self) -> &Arc<Bundle> {
        &self.bundle
    }

    pub fn get_component_managers(&self) -> &[Arc<ComponentManager>] {
        &self.managers
    }
}

impl Drop for BundleExtension {
    fn drop(&mut self) {
        let pending: Vec<_> = self
            .managers
            .drain(..)
            .map(|manager| {
                let transition = manager.disable_transition();
                self.registry
                    .remove_component_manager(manager.get_bundle_id(), manager.get_name());
                (manager, transition)
            })
            .collect();

        for (manager, (future, task)) in pending {
            if let Err(err) = ComponentManager::wait_for_future(&future, &task) {
                self.logger.log_error(
                    LogLevel::Warn,
                    &format!(
                        "Failed to disable component '{}' of bundle '{}'",
                        manager.get_name(),
                        self.bundle.symbolic_name()
                    ),
                    &err,
                );
            }
        }
    }
}

impl std::fmt::Debug for BundleExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleExtension")
            .field("bundle", &self.bundle.id())
            .field("components", &self.managers.len())
            .finish()
    }
}
