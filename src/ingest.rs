//! Fixed-interval ingestion loop
//!
//! [`IngestionLoop`] owns one [`SnapshotSource`] for as long as it runs. It
//! spawns a task that opens the source, fetches a snapshot every `interval`,
//! hands non-empty snapshots to a [`SnapshotSink`] and keeps going no matter
//! how many fetches fail. There is no backoff: a failed fetch is retried on
//! the next tick, so a network blip costs at most one interval of data.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::source::SnapshotSource;
use crate::types::{Series, Snapshot};

/// Receiver of ingested snapshots.
///
/// Called once per successful non-empty fetch, in fetch order, never
/// concurrently for the same loop. Implementations must return promptly and
/// contain their own failures: the loop's cadence waits on this call.
#[async_trait::async_trait]
pub trait SnapshotSink: Send + Sync + 'static {
    async fn on_snapshot(&self, snapshot: Snapshot);
}

/// Live counters for the current (or last) run of a loop.
#[derive(Debug, Default)]
pub struct IngestStats {
    fetches: AtomicU64,
    delivered: AtomicU64,
    failures: AtomicU64,
}

impl IngestStats {
    pub fn counters(&self) -> IngestCounters {
        IngestCounters {
            fetches: self.fetches.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.fetches.store(0, Ordering::Relaxed);
        self.delivered.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestCounters {
    /// Fetch attempts
    pub fetches: u64,
    /// Snapshots handed to the sink
    pub delivered: u64,
    /// Failed opens and fetches
    pub failures: u64,
}

struct RunningLoop {
    series: Series,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Start/stop handle around the ingestion task.
pub struct IngestionLoop {
    running: Option<RunningLoop>,
    stats: Arc<IngestStats>,
}

impl IngestionLoop {
    pub fn new() -> Self {
        Self { running: None, stats: Arc::new(IngestStats::default()) }
    }

    /// Start ingesting from `source`.
    ///
    /// Returns `false` without touching anything when already running; the
    /// passed source is then dropped unopened.
    pub fn start(
        &mut self,
        source: Box<dyn SnapshotSource>,
        interval: Duration,
        sink: Arc<dyn SnapshotSink>,
    ) -> bool {
        if self.is_running() {
            debug!("Ingestion loop already running, ignoring start");
            return false;
        }

        self.stats.reset();
        let series = source.series();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Self::ingest_task(
            source,
            interval,
            sink,
            cancel.clone(),
            self.stats.clone(),
        ));

        info!(%series, interval_secs = interval.as_secs_f64(), "Ingestion loop started");
        self.running = Some(RunningLoop { series, cancel, task });
        true
    }

    /// Stop the loop and wait until the source has been closed.
    ///
    /// Returns `false` when the loop was not running.
    pub async fn stop(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            debug!("Ingestion loop not running, ignoring stop");
            return false;
        };

        running.cancel.cancel();
        if let Err(e) = running.task.await {
            error!(series = %running.series, error = %e, "Ingestion task ended abnormally");
        }
        info!(series = %running.series, "Ingestion loop stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.task.is_finished())
    }

    /// Shared counters, updated while the loop runs.
    pub fn stats(&self) -> Arc<IngestStats> {
        self.stats.clone()
    }

    pub fn counters(&self) -> IngestCounters {
        self.stats.counters()
    }

    async fn ingest_task(
        mut source: Box<dyn SnapshotSource>,
        interval: Duration,
        sink: Arc<dyn SnapshotSink>,
        cancel: CancellationToken,
        stats: Arc<IngestStats>,
    ) {
        let series = source.series();
        let kind = source.kind();
        let mut opened = false;

        loop {
            if !opened {
                let result = tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = source.open() => result,
                };
                match result {
                    Ok(()) => {
                        opened = true;
                        info!(%series, kind, "Snapshot source opened");
                    }
                    Err(e) => {
                        stats.failures.fetch_add(1, Ordering::Relaxed);
                        warn!(%series, kind, error = %e, "Failed to open snapshot source");
                    }
                }
            }

            if opened {
                let attempt = stats.fetches.fetch_add(1, Ordering::Relaxed) + 1;
                let result = tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = source.fetch_snapshot() => result,
                };

                match result {
                    Ok(snapshot) if snapshot.is_empty() => {
                        debug!(%series, attempt, "Snapshot had no cars, not delivered");
                    }
                    Ok(snapshot) => {
                        let cars = snapshot.cars.len();
                        let delivery = AssertUnwindSafe(sink.on_snapshot(snapshot)).catch_unwind();
                        if delivery.await.is_err() {
                            error!(%series, attempt, "Snapshot sink panicked");
                        } else {
                            stats.delivered.fetch_add(1, Ordering::Relaxed);
                            trace!(%series, attempt, cars, "Snapshot delivered");
                        }
                    }
                    Err(e) => {
                        stats.failures.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            %series,
                            kind,
                            attempt,
                            error = %e,
                            retryable = e.is_retryable(),
                            "Snapshot fetch failed"
                        );
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        source.close().await;
        let counters = stats.counters();
        info!(
            %series,
            fetches = counters.fetches,
            delivered = counters.delivered,
            failures = counters.failures,
            "Ingestion task ended"
        );
    }
}

impl Default for IngestionLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IngestionLoop {
    fn drop(&mut self) {
        // The detached task still closes its source after cancellation.
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}
