//! # Trigger Sources
//!
//! Two independent drivers request synchronization through the same `FetchGate`:
//!
//! - **Interval driver**: ticks on a fixed period. The first tick fires at mount,
//!   which doubles as the initial load. Missed ticks are skipped rather than
//!   replayed, and a tick denied by the gate is simply lost.
//! - **Scroll driver**: receives scroll positions, throttles their evaluation to
//!   one per window, and fires when the viewport is within the threshold of the
//!   end of the content.
//!
//! Both drivers ask the gate synchronously. Only an admitted request spawns a
//! fetch task, so a burst of triggers never queues work behind a slow request.
//! Fetch tasks race the engine's mount token; on teardown the pending future is
//! dropped, which releases its admission as cancelled and skips the merge.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::task::TaskTracker;

use crate::core::engine::{FeedEngine, SyncOutcome};
use crate::core::source::FeedSource;
use crate::core::throttle::Throttle;
use crate::errors::SyncError;

/// What asked for a synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Periodic poll.
    Interval,
    /// Scrolled near the end of the content.
    Scroll,
    /// Called directly by the embedding application.
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trigger::Interval => "interval",
            Trigger::Scroll => "scroll",
            Trigger::Manual => "manual",
        })
    }
}

/// A scroll position in arbitrary but consistent units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPosition {
    /// Distance scrolled from the top.
    pub offset: f64,
    /// Height of the visible area.
    pub viewport: f64,
    /// Total height of the scrollable content.
    pub content_height: f64,
}

impl ScrollPosition {
    /// Position with the viewport resting at the very end of the content.
    pub fn at_end(viewport: f64, content_height: f64) -> Self {
        Self {
            offset: (content_height - viewport).max(0.0),
            viewport,
            content_height,
        }
    }

    /// Remaining distance between the bottom of the viewport and the end.
    pub fn distance_to_end(&self) -> f64 {
        self.content_height - (self.offset + self.viewport)
    }

    /// Whether the viewport is within `threshold` of the end.
    pub fn is_near_end(&self, threshold: f64) -> bool {
        self.distance_to_end() <= threshold
    }
}

/// Throttled near-end detector for scroll events.
#[derive(Debug, Clone)]
pub struct ScrollObserver {
    throttle: Throttle,
    threshold: f64,
}

impl ScrollObserver {
    /// Evaluates at most once per `window`; fires within `threshold` of the end.
    pub fn new(threshold: f64, window: Duration) -> Self {
        Self {
            throttle: Throttle::new(window),
            threshold,
        }
    }

    /// Whether the event at `now` should request a synchronization.
    ///
    /// The throttle gates the evaluation itself: an event inside the window is
    /// dropped even if it is near the end, and a passing event far from the end
    /// still consumes the window.
    pub fn observe(&mut self, position: ScrollPosition, now: Instant) -> bool {
        self.throttle.allow(now) && position.is_near_end(self.threshold)
    }

    /// Discards throttle state.
    pub fn cancel(&mut self) {
        self.throttle.cancel();
    }
}

pub(crate) async fn run_interval_driver<S: FeedSource>(
    engine: Arc<FeedEngine<S>>,
    period: Duration,
    tracker: TaskTracker,
) {
    let mounted = engine.mount_token().clone();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    log::debug!("interval driver started ({}s)", period.as_secs_f64());
    loop {
        tokio::select! {
            _ = mounted.cancelled() => break,
            _ = ticker.tick() => dispatch(&engine, &tracker, Trigger::Interval),
        }
    }
    log::debug!("interval driver stopped");
}

pub(crate) async fn run_scroll_driver<S: FeedSource>(
    engine: Arc<FeedEngine<S>>,
    mut events: mpsc::UnboundedReceiver<ScrollPosition>,
    tracker: TaskTracker,
) {
    let mounted = engine.mount_token().clone();
    loop {
        tokio::select! {
            _ = mounted.cancelled() => break,
            event = events.recv() => match event {
                Some(position) => {
                    let now = tokio::time::Instant::now().into_std();
                    if engine.observe_scroll(position, now) {
                        dispatch(&engine, &tracker, Trigger::Scroll);
                    }
                }
                None => break,
            },
        }
    }
    log::debug!("scroll driver stopped");
}

fn dispatch<S: FeedSource>(engine: &Arc<FeedEngine<S>>, tracker: &TaskTracker, trigger: Trigger) {
    let Some(admission) = engine.gate().try_admit() else {
        log::trace!("{trigger} trigger dropped: sync in flight or feed exhausted");
        return;
    };

    let engine = Arc::clone(engine);
    tracker.spawn(async move {
        let mounted = engine.mount_token().clone();
        tokio::select! {
            _ = mounted.cancelled() => {
                log::debug!("{trigger} sync abandoned at teardown");
            }
            result = engine.run_admitted(admission, trigger) => report(trigger, result),
        }
    });
}

fn report(trigger: Trigger, result: Result<SyncOutcome, SyncError>) {
    match result {
        Ok(SyncOutcome::Merged(summary)) => log::debug!(
            "{trigger} sync merged {} records ({} new, {} updated)",
            summary.received,
            summary.added,
            summary.updated
        ),
        Ok(outcome) => log::debug!("{trigger} sync finished: {outcome:?}"),
        Err(e) => log::debug!("{trigger} sync ended with error: {e}"),
    }
}
