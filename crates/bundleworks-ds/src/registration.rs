//! Registration of the service a component provides

use bundleworks_core::properties::SERVICE_SCOPE;
use bundleworks_core::{FrameworkError, FrameworkResult, Properties, ServiceScope};
use bundleworks_framework::{
    BundleContext, ServiceFactory, ServiceReference, ServiceRegistration, ServiceSource,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Owns at most one service registration for a component configuration
pub struct RegistrationManager {
    context: BundleContext,
    interfaces: Vec<String>,
    scope: ServiceScope,
    registration: Mutex<Option<ServiceRegistration>>,
}

impl RegistrationManager {
    /// # Errors
    ///
    /// [`FrameworkError::InvalidArgument`] when `interfaces` is empty.
    pub fn new(
        context: BundleContext,
        interfaces: Vec<String>,
        scope: ServiceScope,
    ) -> FrameworkResult<Self> {
        if interfaces.is_empty() {
            return Err(FrameworkError::InvalidArgument(
                "a provided service needs at least one interface".to_string(),
            ));
        }
        Ok(Self {
            context,
            interfaces,
            scope,
            registration: Mutex::new(None),
        })
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    /// Publish the service, with `factory` producing objects lazily
    ///
    /// `on_registered` runs once the registration is recorded here and
    /// before service listeners are notified. Listeners may call back into
    /// this manager; no lock is held while they run.
    ///
    /// # Errors
    ///
    /// [`FrameworkError::ServiceRegistration`] if the service is already
    /// registered or the registry refuses it.
    pub fn register_service<F>(
        &self,
        factory: Arc<dyn ServiceFactory>,
        mut properties: Properties,
        on_registered: F,
    ) -> FrameworkResult<()>
    where
        F: FnOnce(),
    {
        if self.is_service_registered() {
            return Err(FrameworkError::ServiceRegistration(format!(
                "service {:?} is already registered",
                self.interfaces
            )));
        }
        properties.insert(
            SERVICE_SCOPE.to_string(),
            serde_json::json!(self.scope.to_string()),
        );
        self.context.register_service_with(
            &self.interfaces,
            ServiceSource::Factory(factory),
            properties,
            |registered| {
                *self.registration.lock() = Some(registered.clone());
                on_registered();
            },
        )?;
        Ok(())
    }

    pub fn is_service_registered(&self) -> bool {
        self.registration
            .lock()
            .as_ref()
            .is_some_and(ServiceRegistration::is_registered)
    }

    pub fn get_service_reference(&self) -> Option<ServiceReference> {
        self.registration
            .lock()
            .as_ref()
            .and_then(ServiceRegistration::reference)
    }

    /// Replace the registered service's properties
    pub fn set_properties(&self, properties: Properties) -> FrameworkResult<()> {
        let registration = self.registration.lock();
        match registration.as_ref() {
            Some(registration) => registration.set_properties(properties),
            None => Err(FrameworkError::ServiceRegistration(
                "service is not registered".to_string(),
            )),
        }
    }

    /// Withdraw the service
    ///
    /// # Errors
    ///
    /// [`FrameworkError::ServiceRegistration`] if nothing is registered.
    pub fn unregister_service(&self) -> FrameworkResult<()> {
        // taken out first: unregistering fires events that may call back in
        let registration = self.registration.lock().take();
        match registration {
            Some(registration) if registration.unregister() => Ok(()),
            _ => Err(FrameworkError::ServiceRegistration(format!(
                "service {:?} is not registered",
                self.interfaces
            ))),
        }
    }
}

impl std::fmt::Debug for RegistrationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationManager")
            .field("interfaces", &self.interfaces)
            .field("scope", &self.scope)
            .field("registered", &self.is_service_registered())
            .finish()
    }
}
