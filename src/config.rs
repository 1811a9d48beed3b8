use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(800);
pub const DEFAULT_BANNER_TIMEOUT: Duration = Duration::from_millis(700);
pub const DEFAULT_WORKERS: usize = 200;

/// Larger worker ceilings are clamped down to this by the dispatcher.
pub const MAX_WORKERS: usize = 5_000;

/// Per-run probe settings. Read-only once the run starts.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub connect_timeout: Duration,
    pub banner_timeout: Duration,
    /// Maximum number of probes in flight at any instant.
    pub workers: usize,
    pub capture_banner: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            banner_timeout: DEFAULT_BANNER_TIMEOUT,
            workers: DEFAULT_WORKERS,
            capture_banner: false,
        }
    }
}

impl ScanConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_banner_timeout(mut self, timeout: Duration) -> Self {
        self.banner_timeout = timeout;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_banner(mut self, capture: bool) -> Self {
        self.capture_banner = capture;
        self
    }

    /// Reject configurations that would stall the scan.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(ScanError::InvalidConfig("connect timeout must be positive".into()));
        }
        if self.capture_banner && self.banner_timeout.is_zero() {
            return Err(ScanError::InvalidConfig("banner timeout must be positive".into()));
        }
        if self.workers == 0 {
            return Err(ScanError::InvalidConfig("worker ceiling must be at least 1".into()));
        }
        Ok(())
    }

    /// Longest time one worker slot can stay occupied by a single port.
    pub fn slot_budget(&self) -> Duration {
        if self.capture_banner {
            self.connect_timeout + self.banner_timeout
        } else {
            self.connect_timeout
        }
    }
}

/// Convert a user-supplied seconds value into a positive `Duration`.
pub fn duration_from_secs(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ScanError::InvalidConfig(format!(
            "timeout must be a positive number of seconds, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| ScanError::InvalidConfig(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ScanConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.workers, 200);
        assert!(!cfg.capture_banner);
    }

    #[test]
    fn zero_workers_rejected() {
        let cfg = ScanConfig::default().with_workers(0);
        assert!(matches!(cfg.validate(), Err(ScanError::InvalidConfig(_))));
    }

    #[test]
    fn large_ceiling_is_accepted() {
        let cfg = ScanConfig::default().with_workers(10_000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_timeouts_rejected() {
        let cfg = ScanConfig::default().with_connect_timeout(Duration::ZERO);
        assert!(cfg.validate().is_err());

        let cfg = ScanConfig::default()
            .with_banner(true)
            .with_banner_timeout(Duration::ZERO);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn slot_budget_includes_banner_only_when_enabled() {
        let cfg = ScanConfig::default()
            .with_connect_timeout(Duration::from_millis(100))
            .with_banner_timeout(Duration::from_millis(50));
        assert_eq!(cfg.slot_budget(), Duration::from_millis(100));
        assert_eq!(cfg.with_banner(true).slot_budget(), Duration::from_millis(150));
    }

    #[test]
    fn seconds_conversion() {
        assert_eq!(duration_from_secs(0.8).unwrap(), Duration::from_millis(800));
        assert!(duration_from_secs(0.0).is_err());
        assert!(duration_from_secs(-1.0).is_err());
        assert!(duration_from_secs(f64::NAN).is_err());
    }
}
