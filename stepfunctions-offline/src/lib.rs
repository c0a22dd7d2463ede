//! # stepfunctions-offline
//!
//! Runs AWS Step Functions Local next to a serverless application during
//! local development.
//!
//! ## Features
//!
//! - **Definition Rewriting**: Point task states at local function endpoints
//! - **Execution Events**: Rebuild execution status change events from emulator output
//! - **Lifecycle**: Install, start, register state machines, stop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stepfunctions_offline::{
//!     Config, EventForwarder, LifecycleCoordinator, LogEventSink, ServerlessFile,
//! };
//!
//! # async fn run() -> stepfunctions_offline::Result<()> {
//! let file = ServerlessFile::load_from_file("serverless.yml")?;
//! let config = Config::resolve(file.local.as_ref())?;
//! let state_machines = file.state_machines()?;
//!
//! let forwarder = EventForwarder::new(Arc::new(LogEventSink));
//! let mut coordinator = LifecycleCoordinator::from_config(config, forwarder)?;
//!
//! let arns = coordinator.startup(&state_machines).await?;
//! for (key, arn) in arns.iter() {
//!     println!("{key}={arn}");
//! }
//!
//! coordinator.stop().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Shared helpers
pub mod common;

/// Configuration loading and validation
pub mod config;

/// Lifecycle coordination of the emulator
pub mod coordinator;

/// State machine definitions and resource rewriting
pub mod definition;

/// Emulator installation, process control and management API
pub mod emulator;

/// Error types and handling
pub mod error;

/// Execution events derived from emulator output
pub mod events;

#[cfg(test)]
mod test_support;

pub use config::{Config, ConfigError, EventBridgeConfig, ServerlessFile, YamlConfig};
pub use coordinator::{arn_env_key, ArnRegistry, LifecycleCoordinator, LifecycleState};
pub use definition::{
    rewrite, ResourceMapping, StateMachineDefinition, StateMachineName, StateMachines,
};
pub use emulator::{HttpManagementApi, Installer, ManagementApi};
pub use error::{ErrorContext, OfflineError, Result};
pub use events::{
    translate, EventBridgeSink, EventForwarder, EventNotification, EventSink, ExecutionEvent,
    ExecutionStatus, LogEventSink, MemoryEventSink,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ArnRegistry, Config, EventForwarder, EventSink, ExecutionEvent, ExecutionStatus,
        LifecycleCoordinator, ManagementApi, OfflineError, ResourceMapping, Result,
        StateMachines,
    };
}
