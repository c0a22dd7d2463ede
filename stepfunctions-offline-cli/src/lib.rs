//! sfn-offline CLI Library
//!
//! Command-line definitions and command implementations for the `sfn-offline`
//! binary, exposed as a library so they can be tested directly.

/// Command-line interface definitions and argument parsing
pub mod cli;
/// Error type carrying an exit code
pub mod error;
/// Exit codes used by the CLI application
pub mod exit_codes;
/// The `install` command
pub mod install;
/// Tracing subscriber setup
pub mod logging;
/// serverless.yml discovery and settings resolution
pub mod project;
/// The `rewrite` command
pub mod rewrite;
/// The `config` command
pub mod settings;
/// Ctrl+C and SIGTERM handling
pub mod signal_handler;
/// The `start` command
pub mod start;
/// The `translate` command
pub mod translate;
