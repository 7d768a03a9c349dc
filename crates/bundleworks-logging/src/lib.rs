//! bundleworks-logging - Logging for the lifecycle engine
//!
//! This crate provides:
//! - [`Logger`], the sink the engine reports caught failures to
//! - [`TracingLogger`] and [`MemoryLogger`] implementations
//! - [`CallbackLayer`], a tracing layer that forwards to a host callback
//! - Dynamic log level filtering through [`LogCallbackManager`]

mod callback;
mod layer;
mod sink;

pub use bundleworks_core::LogLevel;
pub use callback::{LogCallback, LogCallbackManager};
pub use layer::{CallbackLayer, init_logging, init_logging_with_level};
pub use sink::{LogRecord, Logger, MemoryLogger, TracingLogger};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{LogLevel, Logger, MemoryLogger, TracingLogger, init_logging};
}
