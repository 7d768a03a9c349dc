//! bundleworks-ds - Declarative component lifecycle engine
//!
//! Components are declared in the `scr` section of a bundle manifest. For each
//! started bundle the runtime:
//! - creates a [`ComponentManager`] per description, enabled or disabled
//! - tracks the services each reference needs with a [`ReferenceManager`]
//! - registers a component's service once its references are satisfied
//! - creates and activates the implementation on first use (or straight away
//!   for immediate components), one instance per requesting bundle for
//!   bundle and prototype scoped services
//! - holds back components whose required configuration data is missing
//! - tears everything down again when a reference is lost or the bundle stops
//!
//! # Example
//!
//! ```ignore
//! use bundleworks_ds::prelude::*;
//!
//! let framework = Framework::new();
//! let bundle = framework.install_bundle("greeter", manifest);
//! ComponentClass::from_fn(|| Arc::new(Greeter::default()) as Arc<dyn ComponentInstance>)
//!     .export(&bundle, "greeter::Greeter");
//!
//! let work = Arc::new(TokioWorkService::with_defaults()?);
//! let ds = DeclarativeServices::new(Arc::new(TracingLogger::new()), work);
//! ds.bundle_started(&bundle)?;
//! ```

mod component;
mod component_registry;
mod config_admin;
mod configuration;
mod context;
mod extension;
mod manager;
mod reference_manager;
mod registration;
mod runtime;
mod scr;

#[cfg(test)]
mod test_support;

pub use component::{ComponentClass, ComponentFactory, ComponentInstance};
pub use component_registry::ComponentRegistry;
pub use config_admin::{
    ConfigurationEvent, ConfigurationEventKind, ConfigurationListener, ConfigurationNotifier,
};
pub use configuration::ComponentConfiguration;
pub use context::ComponentContext;
pub use extension::BundleExtension;
pub use manager::{ComponentManager, PendingTransition};
pub use reference_manager::{RefChangeListener, RefChangeNotification, RefEvent, ReferenceManager};
pub use registration::RegistrationManager;
pub use runtime::DeclarativeServices;
pub use scr::{
    ComponentConfigurationDto, ComponentDescriptionDto, ReferenceDto, SatisfiedReferenceDto,
    ServiceComponentRuntime, UnsatisfiedReferenceDto,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ComponentClass, ComponentContext, ComponentInstance, ComponentManager,
        ConfigurationNotifier, DeclarativeServices, ServiceComponentRuntime,
    };
    pub use bundleworks_core::{
        ComponentMetadata, ComponentState, ConfigurationPolicy, ReferenceMetadata,
    };
    pub use bundleworks_framework::{Bundle, Framework, ServiceObject, ServiceReference};
    pub use bundleworks_logging::{Logger, TracingLogger};
    pub use bundleworks_runtime::{TokioWorkService, TransitionFuture};
}
