//! Network reachability probes: TCP connect and HTTP health endpoints

use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// True when a TCP connection to `host:port` succeeds within `timeout`.
pub async fn check_port(host: &str, port: u16, timeout: Duration) -> bool {
    let addr = format!("{host}:{port}");
    match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(addr = %addr, error = %e, "Port probe refused");
            false
        }
        Err(_) => {
            debug!(addr = %addr, "Port probe timed out");
            false
        }
    }
}

/// Outcome of an HTTP health-endpoint probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HttpHealth {
    /// 2xx response
    Healthy { status: u16 },
    /// Reached the server, but it answered with a non-2xx status
    Degraded { status: u16 },
    /// Connection refused, DNS failure, or timeout
    Unreachable { reason: String },
}

/// Probe an HTTP health URL. Network-level failures map to `Unreachable`,
/// never to an error; a down endpoint is a finding, not a probe failure.
pub async fn http_health(client: &reqwest::Client, url: &str, timeout: Duration) -> HttpHealth {
    match client.get(url).timeout(timeout).send().await {
        Ok(resp) => {
            let status = resp.status().as_u16();
            if resp.status().is_success() {
                HttpHealth::Healthy { status }
            } else {
                HttpHealth::Degraded { status }
            }
        }
        Err(e) => HttpHealth::Unreachable {
            reason: e.to_string(),
        },
    }
}
