//! Environment variable loading utilities
//!
//! Configuration values can be supplied as `STEP_FUNCTIONS_LOCAL_<SUFFIX>`
//! environment variables. Values that fail to parse are ignored so that a
//! stray variable never aborts startup.

use std::env;
use std::str::FromStr;

/// Load an environment variable as an `Option<T>`
pub fn load_env_optional<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Interpret an environment variable as a boolean flag
///
/// Accepts `1`, `true`, `yes` and `on` (case-insensitive) as true and
/// `0`, `false`, `no` and `off` as false. Anything else is treated as unset.
pub fn load_env_flag(key: &str) -> Option<bool> {
    let value = env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Builder for loading multiple environment variables with consistent prefix
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    /// Create a new environment loader with the given prefix
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    /// Full variable name for a suffix
    pub fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }

    /// Load a non-empty string value
    pub fn load_string(&self, suffix: &str) -> Option<String> {
        env::var(self.key(suffix))
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Load an optional parsed value
    pub fn load_optional<T>(&self, suffix: &str) -> Option<T>
    where
        T: FromStr,
    {
        load_env_optional(&self.key(suffix))
    }

    /// Load an optional boolean flag
    pub fn load_flag(&self, suffix: &str) -> Option<bool> {
        load_env_flag(&self.key(suffix))
    }
}
