//! The interface component implementations provide

use crate::context::ComponentContext;
use bundleworks_core::{FrameworkError, FrameworkResult};
use bundleworks_framework::{Bundle, ServiceObject, ServiceReference};
use std::sync::Arc;

/// A live component object managed by the runtime
///
/// Every hook receives `&self`; implementations keep their mutable state
/// behind their own locks. Errors returned from hooks are logged by the
/// runtime and never propagated to callers.
pub trait ComponentInstance: Send + Sync {
    /// Construct the implementation object
    ///
    /// Failure here aborts the activation attempt.
    fn create_instance(&self, context: &ComponentContext) -> anyhow::Result<()>;

    /// Receive the services bound at activation time
    fn bind_references(&self, _context: &ComponentContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn activate(&self, _context: &ComponentContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn deactivate(&self, _context: &ComponentContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn unbind_references(&self, _context: &ComponentContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// A dynamic reference gained a service while the component is active
    fn bind(
        &self,
        _reference_name: &str,
        _reference: &ServiceReference,
        _service: &ServiceObject,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// A dynamic reference lost a service while the component is active
    fn unbind(&self, _reference_name: &str, _reference: &ServiceReference) -> anyhow::Result<()> {
        Ok(())
    }

    /// The object handed to consumers of the provided service
    fn service_object(&self) -> Option<ServiceObject> {
        None
    }
}

/// Creates fresh [`ComponentInstance`]s
pub trait ComponentFactory: Send + Sync {
    fn new_instance(&self) -> Arc<dyn ComponentInstance>;
}

impl<F> ComponentFactory for F
where
    F: Fn() -> Arc<dyn ComponentInstance> + Send + Sync,
{
    fn new_instance(&self) -> Arc<dyn ComponentInstance> {
        self()
    }
}

/// A component implementation as exported from a bundle
///
/// Bundles export one `ComponentClass` per `implementation-class` named in
/// their component descriptions; the runtime looks it up on first activation.
#[derive(Clone)]
pub struct ComponentClass {
    factory: Arc<dyn ComponentFactory>,
}

impl ComponentClass {
    pub fn new(factory: Arc<dyn ComponentFactory>) -> Self {
        Self { factory }
    }

    pub fn from_fn<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn ComponentInstance> + Send + Sync + 'static,
    {
        Self::new(Arc::new(factory))
    }

    pub fn new_instance(&self) -> Arc<dyn ComponentInstance> {
        self.factory.new_instance()
    }

    /// Export this class from `bundle` under `implementation_class`
    pub fn export(self, bundle: &Bundle, implementation_class: &str) {
        bundle.export_symbol(implementation_class, Arc::new(self));
    }

    /// Resolve the class a bundle exports under `implementation_class`
    ///
    /// # Errors
    ///
    /// [`FrameworkError::SharedLibrary`] when the symbol is missing or is not
    /// a component class.
    pub fn load(bundle: &Bundle, implementation_class: &str) -> FrameworkResult<ComponentClass> {
        let symbol = bundle.lookup_symbol(implementation_class)?;
        symbol
            .downcast_ref::<ComponentClass>()
            .cloned()
            .ok_or_else(|| {
                FrameworkError::SharedLibrary(format!(
                    "symbol '{implementation_class}' in bundle '{}' is not a component class",
                    bundle.symbolic_name()
                ))
            })
    }
}

impl std::fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentClass").finish_non_exhaustive()
    }
}
