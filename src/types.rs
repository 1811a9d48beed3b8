use crate::ports::PortRange;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Resolved address plus the inclusive port range to probe.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTarget {
    pub address: IpAddr,
    pub range: PortRange,
}

impl ScanTarget {
    pub fn new(address: IpAddr, range: PortRange) -> Self {
        Self { address, range }
    }

    pub fn socket_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.address, port)
    }
}

/// Outcome of probing one port.
///
/// `banner` is only ever set on open ports; `error` is only set for failures
/// that are not a closed/filtered/timed out port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub port: u16,
    pub is_open: bool,
    pub banner: Option<String>,
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn open(port: u16, banner: Option<String>) -> Self {
        Self {
            port,
            is_open: true,
            banner,
            error: None,
        }
    }

    pub fn closed(port: u16) -> Self {
        Self {
            port,
            is_open: false,
            banner: None,
            error: None,
        }
    }

    pub fn failed(port: u16, error: impl Into<String>) -> Self {
        Self {
            port,
            is_open: false,
            banner: None,
            error: Some(error.into()),
        }
    }
}

/// One discovered open port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OpenPort {
    pub port: u16,
    pub banner: Option<String>,
    /// RFC3339 UTC time the result reached the collector.
    pub discovered_at: String,
}

/// Accumulated outcome of one run. Open ports are kept in discovery order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub address: IpAddr,
    pub range: PortRange,
    pub open: Vec<OpenPort>,
    pub scanned: u64,
    pub total: u64,
    pub errors: u64,
    pub elapsed: Duration,
    pub started_at: String,
    /// True when cancellation stopped the run before every port was probed.
    pub cancelled: bool,
}

impl ScanReport {
    pub fn new(target: &ScanTarget, started_at: String) -> Self {
        Self {
            address: target.address,
            range: target.range,
            open: Vec::new(),
            scanned: 0,
            total: target.range.count(),
            errors: 0,
            elapsed: Duration::ZERO,
            started_at,
            cancelled: false,
        }
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Open ports ordered by port number, for presentation.
    pub fn open_ports_sorted(&self) -> Vec<OpenPort> {
        let mut v = self.open.clone();
        v.sort_by_key(|p| p.port);
        v
    }

    pub fn banner_for(&self, port: u16) -> Option<&str> {
        self.open
            .iter()
            .find(|p| p.port == port)
            .and_then(|p| p.banner.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn target() -> ScanTarget {
        ScanTarget::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            PortRange::new(20, 29).unwrap(),
        )
    }

    #[test]
    fn new_report_is_empty() {
        let r = ScanReport::new(&target(), "now".into());
        assert_eq!(r.total, 10);
        assert_eq!(r.scanned, 0);
        assert!(r.open.is_empty());
        assert!(!r.cancelled);
    }

    #[test]
    fn sorted_view_does_not_reorder_storage() {
        let mut r = ScanReport::new(&target(), "now".into());
        for port in [25, 21, 23] {
            r.open.push(OpenPort {
                port,
                banner: (port == 21).then(|| "220 ftp".to_string()),
                discovered_at: String::new(),
            });
        }
        let sorted: Vec<u16> = r.open_ports_sorted().iter().map(|p| p.port).collect();
        assert_eq!(sorted, vec![21, 23, 25]);
        assert_eq!(r.open[0].port, 25);
        assert_eq!(r.banner_for(21), Some("220 ftp"));
        assert_eq!(r.banner_for(25), None);
    }

    #[test]
    fn failed_result_is_never_open() {
        let r = ProbeResult::failed(80, "too many open files");
        assert!(!r.is_open);
        assert!(r.banner.is_none());
        assert!(r.error.is_some());
    }
}
