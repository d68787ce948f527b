//! Readiness probing for the forward proxy.

use std::time::Duration;

use devmesh_core::{BaseUrl, READY_POLL_INTERVAL};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

/// The proxy never accepted a connection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("Timed out waiting for forward proxy to be ready on port '{port}'")]
    TimedOut { port: u16, timeout: Duration },
}

/// Wait for `localhost:{port}` to accept TCP connections.
///
/// Polls every [`READY_POLL_INTERVAL`] until a connection succeeds or
/// `deadline` elapses.
pub async fn wait_for_port(port: u16, deadline: Duration) -> Result<BaseUrl, ReadinessError> {
    wait_for_port_with_interval(port, deadline, READY_POLL_INTERVAL).await
}

/// [`wait_for_port`] with a custom poll interval.
pub async fn wait_for_port_with_interval(
    port: u16,
    deadline: Duration,
    interval: Duration,
) -> Result<BaseUrl, ReadinessError> {
    debug!(port = %port, "Waiting for forward proxy to accept connections");

    let probe = async {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match TcpStream::connect(("localhost", port)).await {
                Ok(_) => return attempt,
                Err(e) => {
                    debug!(port = %port, attempt = %attempt, "Port not ready: {e}");
                }
            }
            sleep(interval).await;
        }
    };

    match timeout(deadline, probe).await {
        Ok(attempts) => {
            info!(port = %port, attempts = %attempts, "Forward proxy is ready");
            Ok(BaseUrl::for_port(port))
        }
        Err(_) => Err(ReadinessError::TimedOut {
            port,
            timeout: deadline,
        }),
    }
}
