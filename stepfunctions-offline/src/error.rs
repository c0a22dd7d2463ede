//! Unified error handling for the stepfunctions-offline library
//!
//! Every fallible operation in the startup sequence returns [`OfflineError`].
//! Log-line translation and event delivery never produce errors for the
//! caller; see [`crate::events`].

use crate::config::ConfigError;
use crate::definition::DefinitionError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// The main error type for the stepfunctions-offline library
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OfflineError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid or missing configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A state machine definition could not be read
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The emulator could not be installed
    #[error("Failed to install Step Functions Local: {0}")]
    Install(String),

    /// The emulator process could not be started
    #[error("Failed to start Step Functions Local: {0}")]
    Start(String),

    /// The emulator never started listening
    #[error("Step Functions Local did not open {host}:{port} within {timeout:?}")]
    ReadinessTimeout {
        /// Host that was polled
        host: String,
        /// Port that was polled
        port: u16,
        /// How long we waited
        timeout: Duration,
    },

    /// A state machine could not be registered with the emulator
    #[error("Failed to register state machine '{name}': {reason}")]
    Registration {
        /// Name the state machine was registered under
        name: String,
        /// What went wrong
        reason: String,
    },

    /// Two state machines would publish their ARN under the same key
    #[error("State machines '{first}' and '{second}' both publish their ARN as {key}")]
    ArnKeyCollision {
        /// The shared publication key
        key: String,
        /// Machine declared first
        first: String,
        /// Machine declared second
        second: String,
    },

    /// An event sink rejected a notification
    #[error("Failed to deliver event to {sink}: {reason}")]
    EventDelivery {
        /// Name of the sink
        sink: &'static str,
        /// What went wrong
        reason: String,
    },

    /// A lifecycle operation was requested from the wrong state
    #[error("Cannot {operation} while emulator is {from}")]
    InvalidTransition {
        /// The operation that was attempted
        operation: &'static str,
        /// The state the coordinator was in
        from: String,
    },

    /// Other errors
    #[error("{0}")]
    Other(String),

    /// Generic error with context
    #[error("{message}")]
    Context {
        /// Description of what was being attempted
        message: String,
        /// Underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type alias for stepfunctions-offline operations
pub type Result<T> = std::result::Result<T, OfflineError>;

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, msg: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<S: Into<String>>(self, msg: S) -> Result<T> {
        self.map_err(|e| OfflineError::Context {
            message: msg.into(),
            source: Box::new(e),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| OfflineError::Context {
            message: f().into(),
            source: Box::new(e),
        })
    }
}
