//! # Cache Telemetry Polling Ingestor
//!
//! A self-scheduling reader for the remote cache statistics. It polls on its own
//! fixed period, independent of the feed engine, and mirrors the latest successful
//! snapshot.
//!
//! ## Key Points:
//! - **Wholesale replacement**: a successful poll replaces the whole snapshot;
//!   nothing is merged field by field.
//! - **Failures are advisory**: a failed poll is logged and the previous snapshot
//!   stays published. The loop never stops on errors.
//! - **No shared state** with the feed engine; the two may poll concurrently.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::errors::SourceError;
use crate::model::TelemetrySnapshot;

/// Default poll period.
pub const DEFAULT_TELEMETRY_PERIOD: Duration = Duration::from_secs(40);

/// Produces cache statistics.
pub trait StatsSource: Send + Sync + 'static {
    /// Fetches the current statistics.
    fn fetch_stats(&self) -> impl Future<Output = Result<TelemetrySnapshot, SourceError>> + Send;
}

impl<S: StatsSource> StatsSource for Arc<S> {
    fn fetch_stats(&self) -> impl Future<Output = Result<TelemetrySnapshot, SourceError>> + Send {
        (**self).fetch_stats()
    }
}

/// # Telemetry Reader
pub struct TelemetryReader<S> {
    source: S,
    period: Duration,
    snapshot: watch::Sender<Option<TelemetrySnapshot>>,
}

impl<S: StatsSource> TelemetryReader<S> {
    /// Creates a reader with no snapshot yet.
    pub fn new(source: S, period: Duration) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self { source, period, snapshot }
    }

    /// Poll period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs one poll. On success the snapshot is replaced and returned; on
    /// failure the previous snapshot is kept and the error is returned.
    pub async fn poll(&self) -> Result<TelemetrySnapshot, SourceError> {
        match self.source.fetch_stats().await {
            Ok(fresh) => {
                log::debug!("cache telemetry: {}", fresh.summary());
                self.snapshot.send_replace(Some(fresh.clone()));
                Ok(fresh)
            }
            Err(err) => {
                log::warn!("cache telemetry poll failed, keeping previous snapshot: {err}");
                Err(err)
            }
        }
    }

    /// Last successful snapshot, if any.
    pub fn latest(&self) -> Option<TelemetrySnapshot> {
        self.snapshot.borrow().clone()
    }

    /// Receives every replacement of the snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<TelemetrySnapshot>> {
        self.snapshot.subscribe()
    }

    /// # Main Execution Loop
    ///
    /// Polls immediately, then once per period, until `shutdown` is cancelled.
    /// Poll errors are already logged by `poll` and otherwise ignored.
    pub async fn run(&self, shutdown: CancellationToken) {
        log::info!("cache telemetry polling started ({}s)", self.period().as_secs());
        let mut ticker = tokio::time::interval(self.period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    // A poll in progress is abandoned at shutdown.
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = self.poll() => {}
                    }
                }
            }
        }
        log::info!("cache telemetry polling stopped");
    }
}
