use crate::error::{Result, ScanError};
use std::net::{IpAddr, SocketAddr};
use tokio::net::lookup_host;
use tracing::debug;

/// Resolve a hostname or IP literal to the single address to scan.
///
/// IP literals (including bracketed IPv6) are returned as-is without a lookup.
/// For names, the first IPv4 answer is preferred, then the first IPv6 one.
pub async fn resolve_host(host: &str) -> Result<IpAddr> {
    let host = host.trim();
    if host.is_empty() {
        return Err(resolution_error(host, "empty host name"));
    }

    let literal = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = literal.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs: Vec<SocketAddr> = lookup_host((host, 0))
        .await
        .map_err(|e| resolution_error(host, &e.to_string()))?
        .collect();
    let ip = pick_address(&addrs).ok_or_else(|| resolution_error(host, "no addresses returned"))?;
    debug!(host, %ip, candidates = addrs.len(), "resolved target");
    Ok(ip)
}

fn pick_address(addrs: &[SocketAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .map(SocketAddr::ip)
}

fn resolution_error(host: &str, reason: &str) -> ScanError {
    ScanError::Resolution {
        host: host.to_string(),
        reason: reason.to_string(),
    }
}
