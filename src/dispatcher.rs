use crate::config::{ScanConfig, MAX_WORKERS};
use crate::probe::{ProbeOptions, Prober};
use crate::types::{ProbeResult, ScanTarget};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Counters reported by the admission loop once every admitted probe has drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub admitted: u64,
    /// Probes whose task panicked; each still produced a failed `ProbeResult`.
    pub panicked: u64,
    pub cancelled: bool,
    /// Admission stopped because nobody was reading results any more.
    pub abandoned: bool,
}

/// Handle to a running dispatch: the result stream plus the admission task.
pub struct Dispatch {
    pub results: mpsc::Receiver<ProbeResult>,
    pub handle: JoinHandle<DispatchStats>,
}

/// Feeds ports into a fixed pool of worker slots.
///
/// At most `workers` probes run at any instant. Ports are admitted in
/// increasing order, but results arrive in completion order.
pub struct Dispatcher {
    prober: Arc<dyn Prober>,
    opts: ProbeOptions,
    workers: usize,
}

impl Dispatcher {
    /// The worker ceiling is clamped into `1..=MAX_WORKERS`.
    pub fn new(prober: Arc<dyn Prober>, config: &ScanConfig) -> Self {
        let workers = config.workers.clamp(1, MAX_WORKERS);
        if workers != config.workers {
            warn!(requested = config.workers, workers, "worker ceiling clamped");
        }
        Self {
            prober,
            opts: ProbeOptions::from(config),
            workers,
        }
    }


    /// Start admitting ports for `target`. The result stream closes after every
    /// port has produced one result, or after `cancel` fires and in-flight probes drain.
    /// Dropping the result receiver also stops admission.
    pub fn spawn(self, target: ScanTarget, cancel: CancellationToken) -> Dispatch {
        let (tx, rx) = mpsc::channel(self.workers);
        let handle = tokio::spawn(self.admit(target, tx, cancel));
        Dispatch {
            results: rx,
            handle,
        }
    }

    async fn admit(
        self,
        target: ScanTarget,
        tx: mpsc::Sender<ProbeResult>,
        cancel: CancellationToken,
    ) -> DispatchStats {
        let sem = Arc::new(Semaphore::new(self.workers));
        let mut set = JoinSet::new();
        let mut stats = DispatchStats::default();

        for port in target.range.iter() {
            // Cancellation and a dropped receiver win over a free slot.
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    stats.cancelled = true;
                    break;
                }
                _ = tx.closed() => {
                    stats.abandoned = true;
                    break;
                }
                permit = sem.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let prober = self.prober.clone();
            let tx = tx.clone();
            let addr = target.socket_addr(port);
            let opts = self.opts;
            set.spawn(async move {
                let _permit = permit; // slot stays occupied until the result is handed off
                let probe = tokio::spawn(async move { prober.probe(addr, opts).await });
                let (result, panicked) = match probe.await {
                    Ok(r) => (r, false),
                    Err(e) => (ProbeResult::failed(port, format!("probe task failed: {e}")), true),
                };
                // Receiver gone means the run was torn down; nothing left to report to.
                let _ = tx.send(result).await;
                panicked
            });
            stats.admitted += 1;

            while let Some(done) = set.try_join_next() {
                stats.panicked += reap(done);
            }
        }

        if stats.abandoned {
            debug!(admitted = stats.admitted, "result receiver dropped, admission stopped");
        } else if stats.cancelled {
            debug!(
                admitted = stats.admitted,
                in_flight = set.len(),
                "cancellation observed, no further ports admitted"
            );
        }

        drop(tx);
        while let Some(done) = set.join_next().await {
            stats.panicked += reap(done);
        }
        stats
    }
}

fn reap(done: Result<bool, tokio::task::JoinError>) -> u64 {
    match done {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(e) => {
            warn!(error = %e, "probe slot task failed");
            0
        }
    }
}
