//! Logging sink used by the lifecycle engine for caught failures

use bundleworks_core::LogLevel;
use parking_lot::Mutex;
use std::error::Error;

/// Destination for diagnostics about failures the engine absorbs
///
/// Every failure that is caught and not propagated is reported here, with
/// the captured error when there is one.
pub trait Logger: Send + Sync {
    /// Log a message
    fn log(&self, level: LogLevel, message: &str);

    /// Log a message together with the error that caused it
    fn log_error(&self, level: LogLevel, message: &str, error: &(dyn Error + 'static));
}

/// [`Logger`] that forwards to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Trace => tracing::trace!("{}", message),
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
            LogLevel::Off => {}
        }
    }

    fn log_error(&self, level: LogLevel, message: &str, error: &(dyn Error + 'static)) {
        match level {
            LogLevel::Trace => tracing::trace!(error = %error, "{}", message),
            LogLevel::Debug => tracing::debug!(error = %error, "{}", message),
            LogLevel::Info => tracing::info!(error = %error, "{}", message),
            LogLevel::Warn => tracing::warn!(error = %error, "{}", message),
            LogLevel::Error => tracing::error!(error = %error, "{}", message),
            LogLevel::Off => {}
        }
    }
}

/// One entry captured by [`MemoryLogger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub error: Option<String>,
}

/// [`Logger`] that keeps every record in memory
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Records at or above `level`
    pub fn records_at_least(&self, level: LogLevel) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level >= level)
            .cloned()
            .collect()
    }

    /// Whether any record message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.records.lock().iter().any(|r| r.message.contains(needle))
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.records.lock().push(LogRecord {
            level,
            message: message.to_string(),
            error: None,
        });
    }

    fn log_error(&self, level: LogLevel, message: &str, error: &(dyn Error + 'static)) {
        self.records.lock().push(LogRecord {
            level,
            message: message.to_string(),
            error: Some(error.to_string()),
        });
    }
}
