//! Error types for bundleworks

use thiserror::Error;

/// Result type alias for framework operations
pub type FrameworkResult<T> = Result<T, FrameworkError>;

/// Error type for framework and component lifecycle operations
///
/// Errors are `Clone` because a single failure is frequently observed by many
/// holders of the same transition future.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameworkError {
    /// A required collaborator or argument was missing or malformed
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The implementation of a component could not be loaded from its bundle
    #[error("shared library error: {0}")]
    SharedLibrary(String),

    /// User component code failed
    #[error("component failure: {0}")]
    ComponentFailure(String),

    /// A service could not be registered or unregistered
    #[error("service registration error: {0}")]
    ServiceRegistration(String),

    /// An LDAP filter string could not be parsed
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Component description could not be parsed or validated
    #[error("metadata error: {0}")]
    Metadata(String),

    /// Thread pool error
    #[error("runtime error: {0}")]
    RuntimeError(String),

    /// The work behind a future was dropped before it completed
    #[error("operation cancelled")]
    Cancelled,

    /// Waiting for a transition exceeded its deadline
    #[error("operation timed out")]
    Timeout,

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl FrameworkError {
    /// Returns a stable numeric code for this error kind
    pub fn error_code(&self) -> u32 {
        match self {
            FrameworkError::InvalidArgument(_) => 1,
            FrameworkError::SharedLibrary(_) => 2,
            FrameworkError::ComponentFailure(_) => 3,
            FrameworkError::ServiceRegistration(_) => 4,
            FrameworkError::InvalidFilter(_) => 5,
            FrameworkError::Metadata(_) => 6,
            FrameworkError::RuntimeError(_) => 7,
            FrameworkError::Cancelled => 8,
            FrameworkError::Timeout => 9,
            FrameworkError::Internal(_) => 10,
        }
    }

    /// Create an error from an error code and message
    pub fn from_code(code: u32, message: String) -> Self {
        match code {
            1 => FrameworkError::InvalidArgument(message),
            2 => FrameworkError::SharedLibrary(message),
            3 => FrameworkError::ComponentFailure(message),
            4 => FrameworkError::ServiceRegistration(message),
            5 => FrameworkError::InvalidFilter(message),
            6 => FrameworkError::Metadata(message),
            7 => FrameworkError::RuntimeError(message),
            8 => FrameworkError::Cancelled,
            9 => FrameworkError::Timeout,
            _ => FrameworkError::Internal(message),
        }
    }

    /// Whether this error means the declaring bundle itself is broken.
    ///
    /// Such errors are propagated to callers instead of being logged and absorbed.
    pub fn is_shared_library(&self) -> bool {
        matches!(self, FrameworkError::SharedLibrary(_))
    }
}

impl From<serde_json::Error> for FrameworkError {
    fn from(err: serde_json::Error) -> Self {
        FrameworkError::Metadata(err.to_string())
    }
}


#[cfg(test)]
#[path = "error/error_parameterized_tests.rs"]
mod error_parameterized_tests;
