//! Library crate for host-scan-rs: a bounded-concurrency TCP connect scanner for one host.
pub mod collector;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod output;
pub mod ports;
pub mod probe;
pub mod resolve;
pub mod scanner;
pub mod types;

pub use collector::{ChannelSink, DiscoverySink, NullSink};
pub use config::ScanConfig;
pub use error::ScanError;
pub use ports::PortRange;
pub use scanner::Scanner;
pub use types::{OpenPort, ProbeResult, ScanReport, ScanTarget};
