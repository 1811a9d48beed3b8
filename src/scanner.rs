use crate::collector::{now_rfc3339, Collector, DiscoverySink};
use crate::config::ScanConfig;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::ports::PortRange;
use crate::probe::{Prober, TcpProber};
use crate::resolve;
use crate::types::{ScanReport, ScanTarget};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runs one full scan of a single host: dispatch, collect, time, finalize.
///
/// - Limits concurrent probes to `config.workers` using a `Semaphore`.
/// - Streams each open port to the caller's `DiscoverySink` as it is found.
/// - On cancellation stops admitting ports, lets in-flight probes finish,
///   and returns the partial report flagged as `cancelled`.
#[derive(Clone)]
pub struct Scanner {
    config: ScanConfig,
    prober: Arc<dyn Prober>,
}

impl Scanner {
    /// Scanner backed by real TCP connects.
    pub fn new(config: ScanConfig) -> Self {
        Self::with_prober(config, Arc::new(TcpProber))
    }

    pub fn with_prober(config: ScanConfig, prober: Arc<dyn Prober>) -> Self {
        Self { config, prober }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan an already-resolved target.
    pub async fn run<S>(
        &self,
        target: &ScanTarget,
        sink: &mut S,
        cancel: CancellationToken,
    ) -> Result<ScanReport>
    where
        S: DiscoverySink + ?Sized,
    {
        self.config.validate()?;

        info!(
            address = %target.address,
            range = %target.range,
            workers = self.config.workers,
            banner = self.config.capture_banner,
            slot_budget_ms = self.config.slot_budget().as_millis() as u64,
            "scan started"
        );
        let start = Instant::now();
        let report = ScanReport::new(target, now_rfc3339());

        // Dropping this future cancels the dispatcher through the guard.
        let scan_token = cancel.child_token();
        let _guard = scan_token.clone().drop_guard();
        let mut dispatch =
            Dispatcher::new(self.prober.clone(), &self.config).spawn(*target, scan_token);
        let mut report = Collector::new(report, sink)
            .drain(&mut dispatch.results)
            .await;
        let stats = dispatch.handle.await?;

        report.elapsed = start.elapsed();
        report.cancelled = cancel.is_cancelled() && report.scanned < report.total;

        if report.errors > 0 {
            warn!(
                errors = report.errors,
                panicked = stats.panicked,
                "some probes failed locally and were counted as closed"
            );
        }
        info!(
            scanned = report.scanned,
            admitted = stats.admitted,
            open = report.open_count(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            cancelled = report.cancelled,
            "scan finished"
        );
        Ok(report)
    }

    /// Validate, resolve `host` exactly once, then scan it.
    ///
    /// Configuration and resolution errors abort before any probe is issued.
    pub async fn scan_host<S>(
        &self,
        host: &str,
        range: PortRange,
        sink: &mut S,
        cancel: CancellationToken,
    ) -> Result<ScanReport>
    where
        S: DiscoverySink + ?Sized,
    {
        self.config.validate()?;
        let address = resolve::resolve_host(host).await?;
        self.run(&ScanTarget::new(address, range), sink, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::NullSink;
    use crate::probe::ProbeOptions;
    use crate::types::ProbeResult;
    use async_trait::async_trait;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct OpenOn(u16, AtomicUsize);

    #[async_trait]
    impl Prober for OpenOn {
        async fn probe(&self, addr: SocketAddr, _opts: ProbeOptions) -> ProbeResult {
            self.1.fetch_add(1, Ordering::SeqCst);
            if addr.port() == self.0 {
                ProbeResult::open(addr.port(), Some("HELLO".into()))
            } else {
                ProbeResult::closed(addr.port())
            }
        }
    }

    #[tokio::test]
    async fn invalid_config_issues_no_probes() {
        let prober = Arc::new(OpenOn(7, AtomicUsize::new(0)));
        let scanner = Scanner::with_prober(ScanConfig::default().with_workers(0), prober.clone());
        let target = ScanTarget::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            PortRange::new(1, 10).unwrap(),
        );

        let res = scanner.run(&target, &mut NullSink, CancellationToken::new()).await;
        assert!(res.is_err());
        assert_eq!(prober.1.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn report_counts_every_port() {
        let prober = Arc::new(OpenOn(7, AtomicUsize::new(0)));
        let scanner = Scanner::with_prober(ScanConfig::default().with_workers(3), prober.clone());
        let target = ScanTarget::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            PortRange::new(1, 10).unwrap(),
        );

        let report = scanner
            .run(&target, &mut NullSink, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.scanned, 10);
        assert_eq!(report.total, 10);
        assert_eq!(report.errors, 0);
        assert!(!report.cancelled);
        assert_eq!(report.banner_for(7), Some("HELLO"));
        assert_eq!(prober.1.load(Ordering::SeqCst), 10);
    }
}
