//! Common utilities module

/// Environment variable loading utilities
pub mod env_loader;

/// HTTP client construction
pub mod http;

pub use env_loader::{load_env_flag, load_env_optional, EnvLoader};
pub use http::http_client;
