//! # bundleworks
//!
//! A service registry and declarative component runtime for modular Rust
//! applications.
//!
//! Bundles publish and consume services through a shared registry. Bundles
//! that declare components in their manifest have them managed for them:
//! - references are tracked against the registry, with LDAP target filters
//! - a component's service is published once its references are satisfied
//! - implementations are created lazily, or straight away when immediate
//! - everything is torn down again when a dependency disappears
//!
//! ## Declaring Components
//!
//! Components live in the `scr` section of a bundle manifest:
//!
//! ```json
//! {
//!   "scr": {
//!     "version": 1,
//!     "components": [
//!       {
//!         "name": "greeter",
//!         "implementation-class": "greeter::Greeter",
//!         "service": { "interfaces": ["greeter::Greeting"] },
//!         "references": [
//!           { "name": "clock", "interface": "time::Clock", "target": "(zone=utc)" }
//!         ]
//!       }
//!     ]
//!   }
//! }
//! ```
//!
//! ## Implementing a Component
//!
//! ```ignore
//! use bundleworks::prelude::*;
//!
//! #[derive(Default)]
//! struct Greeter;
//!
//! impl ComponentInstance for Greeter {
//!     fn create_instance(&self, _ctx: &ComponentContext) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//!
//!     fn activate(&self, ctx: &ComponentContext) -> anyhow::Result<()> {
//!         let clock = ctx.locate::<Clock>("clock");
//!         tracing::info!(bound = clock.is_some(), "Greeter activated");
//!         Ok(())
//!     }
//!
//!     fn service_object(&self) -> Option<ServiceObject> {
//!         Some(Arc::new(String::from("hello")))
//!     }
//! }
//!
//! let framework = Framework::new();
//! let bundle = framework.install_bundle("greeter", manifest);
//! ComponentClass::from_fn(|| Arc::new(Greeter) as Arc<dyn ComponentInstance>)
//!     .export(&bundle, "greeter::Greeter");
//!
//! let ds = DeclarativeServices::new(
//!     Arc::new(TracingLogger::new()),
//!     Arc::new(TokioWorkService::with_defaults()?),
//! );
//! ds.bundle_started(&bundle)?;
//! ```
//!
//! ## Crate Structure
//!
//! This is a facade crate that re-exports from:
//! - [`bundleworks_core`] - Errors, component metadata and lifecycle states
//! - [`bundleworks_runtime`] - Transition futures, latches and the work pool
//! - [`bundleworks_logging`] - The `Logger` seam and tracing integration
//! - [`bundleworks_framework`] - Bundles, the service registry and LDAP filters
//! - [`bundleworks_ds`] - The declarative component runtime

// Re-export core types
pub use bundleworks_core::{
    Cardinality, ComponentMetadata, ComponentState, ConfigurationPolicy, FrameworkError,
    FrameworkResult, LogLevel, Properties, ReferenceMetadata, ReferencePolicy,
    ReferencePolicyOption, ReferenceScope, ScrManifest, ServiceMetadata, ServiceScope,
};

// Re-export runtime types
pub use bundleworks_runtime::{
    AsyncWorkService, ManualWorkService, RuntimeConfig, TokioWorkService, TransitionFuture,
};

// Re-export logging types
pub use bundleworks_logging::{Logger, MemoryLogger, TracingLogger, init_logging};

// Re-export framework types
pub use bundleworks_framework::{
    Bundle, BundleContext, Framework, LdapFilter, ServiceObject, ServiceReference,
    ServiceRegistration, ServiceRegistry, ServiceSource,
};

// Re-export component runtime types
pub use bundleworks_ds::{
    ComponentClass, ComponentConfigurationDto, ComponentContext, ComponentDescriptionDto,
    ComponentInstance, ConfigurationNotifier, DeclarativeServices, ServiceComponentRuntime,
};

// Re-export common dependencies that component authors need
pub use anyhow;
pub use serde;
pub use serde_json;
pub use tracing;

/// Prelude module for convenient imports.
///
/// Use `use bundleworks::prelude::*;` to import commonly used types.
///
/// This includes:
/// - Component authoring: `ComponentInstance`, `ComponentContext`, `ComponentClass`
/// - Runtime: `DeclarativeServices`, `ServiceComponentRuntime`, `TokioWorkService`
/// - Registry: `Framework`, `Bundle`, `ServiceObject`, `ServiceReference`
/// - Logging: `Logger`, `TracingLogger`, `LogLevel`
pub mod prelude {
    pub use crate::{
        Bundle, ComponentClass, ComponentContext, ComponentInstance, ComponentMetadata,
        ComponentState, DeclarativeServices, Framework, FrameworkError, FrameworkResult, LogLevel,
        Logger, ServiceComponentRuntime, ServiceObject, ServiceReference, TokioWorkService,
        TracingLogger, TransitionFuture,
    };

    pub use std::sync::Arc;

    // Serde derives (commonly needed for service payloads)
    pub use serde::{Deserialize, Serialize};
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod lib_tests;
