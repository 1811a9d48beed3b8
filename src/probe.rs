use crate::config::ScanConfig;
use crate::types::ProbeResult;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpSocket, TcpStream};
use tokio::time;
use tracing::trace;

/// Maximum number of banner bytes captured from a single read.
pub const BANNER_CAP: usize = 1024;

/// Timeouts and flags threaded into every probe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOptions {
    pub connect_timeout: Duration,
    pub banner_timeout: Duration,
    pub capture_banner: bool,
}

impl From<&ScanConfig> for ProbeOptions {
    fn from(cfg: &ScanConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout,
            banner_timeout: cfg.banner_timeout,
            capture_banner: cfg.capture_banner,
        }
    }
}

/// A single bounded attempt against one `(address, port)` pair.
///
/// Implementations must return within `connect_timeout + banner_timeout` and
/// must not touch shared state.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, addr: SocketAddr, opts: ProbeOptions) -> ProbeResult;
}

/// Real TCP connect prober.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, addr: SocketAddr, opts: ProbeOptions) -> ProbeResult {
        probe(addr, opts).await
    }
}

/// Connect to `addr` within `connect_timeout` and optionally read a banner.
///
/// - Refused, unreachable and timed out connects all come back closed, without `error`.
/// - Failing to create the local socket (e.g. descriptor exhaustion) sets `error`.
/// - The connection is dropped before returning on every path.
pub async fn probe(addr: SocketAddr, opts: ProbeOptions) -> ProbeResult {
    let port = addr.port();
    let socket = match new_socket(&addr) {
        Ok(s) => s,
        Err(e) => return ProbeResult::failed(port, format!("socket: {e}")),
    };

    let mut stream = match time::timeout(opts.connect_timeout, socket.connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            trace!(port, error = %e, "connect failed");
            return ProbeResult::closed(port);
        }
        Err(_) => {
            trace!(port, "connect timed out");
            return ProbeResult::closed(port);
        }
    };

    let banner = if opts.capture_banner {
        read_banner(&mut stream, opts.banner_timeout).await
    } else {
        None
    };
    drop(stream);
    trace!(port, has_banner = banner.is_some(), "open");
    ProbeResult::open(port, banner)
}

fn new_socket(addr: &SocketAddr) -> std::io::Result<TcpSocket> {
    match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }
}

/// Read the first chunk (up to `BANNER_CAP` bytes) the peer sends unprompted.
async fn read_banner(stream: &mut TcpStream, timeout: Duration) -> Option<String> {
    let mut buf = vec![0u8; BANNER_CAP];
    match time::timeout(timeout, stream.read(&mut buf)).await {
        Ok(Ok(n)) if n > 0 => decode_banner(&buf[..n]),
        _ => None,
    }
}

/// Lossy UTF-8 decode with surrounding whitespace trimmed; empty becomes `None`.
pub fn decode_banner(bytes: &[u8]) -> Option<String> {
    let s = String::from_utf8_lossy(bytes);
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
