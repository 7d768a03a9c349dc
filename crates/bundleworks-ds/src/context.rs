//! Runtime services handed to component instances

use crate::component_registry::ComponentRegistry;
use crate::reference_manager::ReferenceManager;
use bundleworks_core::{FrameworkError, FrameworkResult, LogLevel, Properties};
use bundleworks_framework::{Bundle, ServiceObject, ServiceReference};
use bundleworks_logging::Logger;
use bundleworks_runtime::TransitionFuture;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

#[derive(Clone)]
struct BoundService {
    reference: ServiceReference,
    service: ServiceObject,
}

/// The view a component instance has of the runtime
///
/// Holds the service objects bound to each reference while the instance is
/// alive. Once the instance is destroyed the context is invalidated: bound
/// services are released and every lookup comes back empty.
pub struct ComponentContext {
    bundle: Arc<Bundle>,
    using_bundle: u64,
    properties: Properties,
    registry: Weak<ComponentRegistry>,
    logger: Arc<dyn Logger>,
    bound: RwLock<BTreeMap<String, Vec<BoundService>>>,
    valid: AtomicBool,
}

impl ComponentContext {
    pub(crate) fn new(
        bundle: Arc<Bundle>,
        using_bundle: u64,
        properties: Properties,
        registry: Weak<ComponentRegistry>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            bundle,
            using_bundle,
            properties,
            registry,
            logger,
            bound: RwLock::new(BTreeMap::new()),
            valid: AtomicBool::new(true),
        }
    }

    /// Resolve the services currently bound by each reference manager
    pub(crate) fn bind_initial(&self, managers: &[Arc<ReferenceManager>]) {
        for manager in managers {
            for reference in manager.get_bound_references() {
                self.add_to_bound_services(manager.get_reference_name(), &reference);
            }
        }
    }

    /// Component properties, including `component.name` and `component.id`
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// The bundle declaring the component
    pub fn bundle(&self) -> &Arc<Bundle> {
        &self.bundle
    }

    /// Id of the bundle whose request caused the activation
    pub fn using_bundle(&self) -> u64 {
        self.using_bundle
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Best service bound to `reference_name`
    pub fn locate_service(&self, reference_name: &str) -> Option<ServiceObject> {
        if !self.is_valid() {
            return None;
        }
        self.bound
            .read()
            .get(reference_name)
            .and_then(|services| services.first())
            .map(|bound| Arc::clone(&bound.service))
    }

    /// Best service bound to `reference_name`, downcast to `T`
    pub fn locate<T: Any + Send + Sync>(&self, reference_name: &str) -> Option<Arc<T>> {
        self.locate_service(reference_name)?.downcast::<T>().ok()
    }

    /// Service bound to `reference_name` for one specific reference
    pub fn locate_service_for(
        &self,
        reference_name: &str,
        reference: &ServiceReference,
    ) -> Option<ServiceObject> {
        if !self.is_valid() {
            return None;
        }
        self.bound
            .read()
            .get(reference_name)?
            .iter()
            .find(|bound| bound.reference.id() == reference.id())
            .map(|bound| Arc::clone(&bound.service))
    }

    /// Every service bound to `reference_name`, best first
    pub fn locate_services(&self, reference_name: &str) -> Vec<ServiceObject> {
        if !self.is_valid() {
            return Vec::new();
        }
        self.bound
            .read()
            .get(reference_name)
            .map(|services| services.iter().map(|b| Arc::clone(&b.service)).collect())
            .unwrap_or_default()
    }

    /// Enable another component declared by the same bundle
    pub fn enable_component(&self, name: &str) -> FrameworkResult<TransitionFuture> {
        let manager = self.sibling(name)?;
        Ok(manager.enable())
    }

    /// Disable another component declared by the same bundle
    pub fn disable_component(&self, name: &str) -> FrameworkResult<TransitionFuture> {
        let manager = self.sibling(name)?;
        Ok(manager.disable())
    }

    fn sibling(&self, name: &str) -> FrameworkResult<Arc<crate::manager::ComponentManager>> {
        if !self.is_valid() {
            return Err(FrameworkError::InvalidArgument(
                "component context is no longer valid".to_string(),
            ));
        }
        let registry = self.registry.upgrade().ok_or_else(|| {
            FrameworkError::Internal("component registry has been shut down".to_string())
        })?;
        registry
            .get_component_manager(self.bundle.id(), name)
            .ok_or_else(|| {
                FrameworkError::InvalidArgument(format!(
                    "bundle '{}' declares no component named '{name}'",
                    self.bundle.symbolic_name()
                ))
            })
    }

    /// Resolve `reference` and remember it under `reference_name`
    pub(crate) fn add_to_bound_services(
        &self,
        reference_name: &str,
        reference: &ServiceReference,
    ) -> Option<ServiceObject> {
        if !self.is_valid() {
            return None;
        }
        let service = match self.bundle.context().get_service(reference) {
            Ok(Some(service)) => service,
            Ok(None) => return None,
            Err(err) => {
                self.logger.log_error(
                    LogLevel::Warn,
                    &format!("Failed to get service for reference '{reference_name}'"),
                    &err,
                );
                return None;
            }
        };

        let mut bound = self.bound.write();
        let services = bound.entry(reference_name.to_string()).or_default();
        services.push(BoundService {
            reference: reference.clone(),
            service: Arc::clone(&service),
        });
        services.sort_by(|a, b| a.reference.cmp(&b.reference));
        Some(service)
    }

    /// Forget the service bound for `reference` and release it
    pub(crate) fn remove_from_bound_services(&self, reference_name: &str, reference: &ServiceReference) {
        let removed = {
            let mut bound = self.bound.write();
            let Some(services) = bound.get_mut(reference_name) else {
                return;
            };
            let before = services.len();
            services.retain(|b| b.reference.id() != reference.id());
            before != services.len()
        };
        if removed {
            self.bundle.context().unget_service(reference);
        }
    }

    /// Release every bound service and refuse further lookups
    pub(crate) fn invalidate(&self) {
        if !self.valid.swap(false, Ordering::AcqRel) {
            return;
        }
        let bound = std::mem::take(&mut *self.bound.write());
        let context = self.bundle.context();
        for bound in bound.into_values().flatten() {
            context.unget_service(&bound.reference);
        }
    }
}

impl std::fmt::Debug for ComponentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentContext")
            .field("bundle", &self.bundle.id())
            .field("using_bundle", &self.using_bundle)
            .field("valid", &self.is_valid())
            .finish()
    }
}
