use crate::error::{OfflineError, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;

/// Wait until `host:port` accepts TCP connections
///
/// Polls every `poll_interval` until `timeout` has elapsed. Each connection
/// attempt is itself bounded by the poll interval so a black-holed address
/// cannot stall the wait past its deadline.
pub async fn wait_until_port_open(
    host: &str,
    port: u16,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let attempt = tokio::time::timeout(poll_interval, TcpStream::connect((host, port))).await;
        if let Ok(Ok(_stream)) = attempt {
            tracing::debug!("{}:{} open after {} attempts", host, port, attempts);
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(OfflineError::ReadinessTimeout {
                host: host.to_string(),
                port,
                timeout,
            });
        }

        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}
