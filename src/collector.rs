use crate::types::{OpenPort, ProbeResult, ScanReport};
use ::time::{format_description::well_known, OffsetDateTime};
use tokio::sync::mpsc;
use tracing::trace;

/// Push-based receiver of "open port found" events.
///
/// Called once per open port, as soon as its result reaches the collector.
pub trait DiscoverySink: Send {
    fn on_open(&mut self, found: &OpenPort);
}

impl<F> DiscoverySink for F
where
    F: FnMut(&OpenPort) + Send,
{
    fn on_open(&mut self, found: &OpenPort) {
        self(found)
    }
}

/// Forwards discoveries to a channel; a closed receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink(pub mpsc::UnboundedSender<OpenPort>);

impl DiscoverySink for ChannelSink {
    fn on_open(&mut self, found: &OpenPort) {
        let _ = self.0.send(found.clone());
    }
}

/// Discards discoveries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiscoverySink for NullSink {
    fn on_open(&mut self, _found: &OpenPort) {}
}

/// Single writer of the report's open-port set.
pub struct Collector<'a, S: DiscoverySink + ?Sized> {
    report: ScanReport,
    sink: &'a mut S,
}

impl<'a, S: DiscoverySink + ?Sized> Collector<'a, S> {
    pub fn new(report: ScanReport, sink: &'a mut S) -> Self {
        Self { report, sink }
    }

    /// Apply one probe outcome. Closed ports only bump the scanned counter.
    pub fn record(&mut self, result: ProbeResult) {
        self.report.scanned += 1;

        if let Some(err) = &result.error {
            self.report.errors += 1;
            trace!(port = result.port, error = %err, "probe failed");
        }

        if result.is_open {
            let found = OpenPort {
                port: result.port,
                banner: result.banner,
                discovered_at: now_rfc3339(),
            };
            self.sink.on_open(&found);
            self.report.open.push(found);
        }
    }

    /// Consume results until the stream closes, then hand back the report.
    pub async fn drain(mut self, results: &mut mpsc::Receiver<ProbeResult>) -> ScanReport {
        while let Some(result) = results.recv().await {
            self.record(result);
        }
        self.report
    }

    pub fn into_report(self) -> ScanReport {
        self.report
    }
}

/// RFC3339 UTC timestamp.
pub fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortRange;
    use crate::types::ScanTarget;
    use std::net::{IpAddr, Ipv4Addr};

    fn empty_report() -> ScanReport {
        let target = ScanTarget::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            PortRange::new(1, 10).unwrap(),
        );
        ScanReport::new(&target, now_rfc3339())
    }

    #[test]
    fn open_results_are_streamed_in_arrival_order() {
        let mut events = Vec::new();
        let mut sink = |p: &OpenPort| events.push(p.port);
        let mut c = Collector::new(empty_report(), &mut sink);

        c.record(ProbeResult::closed(1));
        c.record(ProbeResult::open(9, None));
        c.record(ProbeResult::open(4, Some("hi".into())));
        c.record(ProbeResult::failed(5, "socket: too many open files"));

        let report = c.into_report();
        assert_eq!(events, vec![9, 4]);
        assert_eq!(report.scanned, 4);
        assert_eq!(report.errors, 1);
        assert_eq!(report.open_count(), 2);
        assert_eq!(report.banner_for(4), Some("hi"));
    }

    #[tokio::test]
    async fn drain_consumes_until_stream_closes() {
        let (tx, mut rx) = mpsc::channel(4);
        tokio::spawn(async move {
            for port in 1..=10u16 {
                let r = if port == 7 {
                    ProbeResult::open(port, Some("HELLO".into()))
                } else {
                    ProbeResult::closed(port)
                };
                tx.send(r).await.unwrap();
            }
        });

        let (etx, mut erx) = mpsc::unbounded_channel();
        let mut sink = ChannelSink(etx);
        let report = Collector::new(empty_report(), &mut sink).drain(&mut rx).await;

        assert_eq!(report.scanned, 10);
        assert_eq!(report.open_count(), 1);
        let event = erx.recv().await.unwrap();
        assert_eq!(event.port, 7);
        assert_eq!(event.banner.as_deref(), Some("HELLO"));
    }
}
