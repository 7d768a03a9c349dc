//! bundleworks-core - Core types, metadata and error handling
//!
//! This crate provides the foundational types shared by the bundleworks crates:
//! - [`FrameworkError`] for error handling
//! - [`ComponentMetadata`] and friends describing declared components
//! - [`ComponentState`] for introspecting component configurations
//! - [`Properties`] and well-known property keys

mod error;
mod metadata;
pub mod properties;
mod state;

pub use error::{FrameworkError, FrameworkResult};
pub use metadata::{
    COMPONENT_NAME_PID, Cardinality, ComponentMetadata, ConfigurationPolicy, ReferenceMetadata,
    ReferencePolicy, ReferencePolicyOption, ReferenceScope, SCR_MANIFEST_VERSION, ScrManifest,
    ServiceMetadata, ServiceScope,
};
pub use properties::Properties;
pub use state::ComponentState;

/// Log severity levels
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Off = 5,
}

impl LogLevel {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            _ => LogLevel::Off,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Off => write!(f, "OFF"),
        }
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Cardinality, ComponentMetadata, ComponentState, ConfigurationPolicy, FrameworkError, FrameworkResult, LogLevel,
        Properties, ReferenceMetadata, ReferencePolicy, ReferencePolicyOption,
    };
}

#[cfg(test)]
mod lib_tests;
