use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_PORT: u16 = 1;
pub const MAX_PORT: u16 = 65535;

/// Inclusive range of TCP ports, always within `1..=65535` with `start <= end`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    /// Build a range from already-valid bounds. Errors if `start > end` or either bound is 0.
    pub fn new(start: u16, end: u16) -> Result<Self> {
        if start < MIN_PORT || end < MIN_PORT {
            return Err(ScanError::InvalidPort("port 0 is not scannable".into()));
        }
        if start > end {
            return Err(ScanError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Clamp arbitrary user bounds into `[1, 65535]`, then validate ordering.
    ///
    /// `clamped(0, 70000)` is the full range; `clamped(500, 10)` is rejected.
    pub fn clamped(start: i64, end: i64) -> Result<Self> {
        let start = clamp_port(start);
        let end = clamp_port(end);
        Self::new(start, end)
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    /// Number of ports in the range (always at least 1).
    pub fn count(&self) -> u64 {
        u64::from(self.end - self.start) + 1
    }

    /// Ports in increasing order.
    pub fn iter(&self) -> std::ops::RangeInclusive<u16> {
        self.start..=self.end
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self { start: 1, end: 1024 }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Accepts `8000-8010` or a single port `80`; bounds are clamped like `clamped`.
impl FromStr for PortRange {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some((a, b)) = s.split_once('-') {
            let start = parse_bound(a.trim())?;
            let end = parse_bound(b.trim())?;
            return Self::clamped(start, end);
        }
        let p = parse_bound(s)?;
        Self::clamped(p, p)
    }
}

fn clamp_port(v: i64) -> u16 {
    v.clamp(i64::from(MIN_PORT), i64::from(MAX_PORT)) as u16
}

fn parse_bound(s: &str) -> Result<i64> {
    s.parse::<i64>()
        .map_err(|e| ScanError::InvalidPort(format!("{s}: {e}")))
}
