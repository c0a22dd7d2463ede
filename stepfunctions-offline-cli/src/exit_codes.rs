//! Exit code constants for CLI commands
//!
//! - 0: Success
//! - 1: Runtime failure (install, start, registration)
//! - 2: Invalid configuration or input

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// The environment could not be brought up or torn down
pub const EXIT_RUNTIME_FAILURE: i32 = 1;

/// Configuration, definition or input errors
pub const EXIT_INVALID_INPUT: i32 = 2;
