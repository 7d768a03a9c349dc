//! bundleworks-framework - Bundles, services and filters
//!
//! The module layer the component runtime is built on:
//! - [`Framework`] installs [`Bundle`]s and owns the [`ServiceRegistry`]
//! - [`BundleContext`] registers, finds and resolves services for one bundle
//! - [`ServiceReference`] orders candidates by ranking and id
//! - [`LdapFilter`] matches service properties

mod bundle;
mod framework;
mod ldap;
mod reference;
mod registry;

pub use bundle::{Bundle, BundleContext, SCR_MANIFEST_KEY, Symbol};
pub use framework::{Framework, SYSTEM_BUNDLE_NAME};
pub use ldap::LdapFilter;
pub use reference::ServiceReference;
pub use registry::{
    ServiceEvent, ServiceEventKind, ServiceFactory, ServiceListener, ServiceObject,
    ServiceRegistration, ServiceRegistry, ServiceSource,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Bundle, BundleContext, Framework, LdapFilter, ServiceEvent, ServiceEventKind,
        ServiceFactory, ServiceObject, ServiceReference, ServiceRegistration, ServiceSource,
    };
}
