use thiserror::Error;

/// Result alias for fallible scan setup and orchestration.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that abort a run before or outside of probing.
///
/// Per-port outcomes (refused, timed out, no banner) are never errors; they
/// travel as ordinary `ProbeResult` values.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Port range is empty after clamping.
    #[error("invalid port range {start}-{end} (start > end)")]
    InvalidRange { start: u16, end: u16 },

    /// A port value could not be parsed or is outside 1..=65535.
    #[error("invalid port value: {0}")]
    InvalidPort(String),

    /// Timeouts or worker ceiling are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The target host name could not be resolved to an address.
    #[error("cannot resolve host {host}: {reason}")]
    Resolution { host: String, reason: String },

    /// The dispatcher task itself failed.
    #[error("dispatcher failed: {0}")]
    Dispatch(#[from] tokio::task::JoinError),
}
