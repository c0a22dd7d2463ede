//! HTTP client construction

use crate::error::Result;
use std::time::Duration;

/// Client whose requests give up after `timeout`
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()?)
}
