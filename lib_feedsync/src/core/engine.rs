//! # Feed Synchronization Engine
//!
//! Keeps a local, deduplicated and ordered view of a remote feed in sync, driven
//! by an interval timer and by scroll proximity, with at most one fetch in flight.
//!
//! ## Flow of one synchronization:
//! 1. A trigger asks the `FetchGate`; a denial ends the attempt (no queueing).
//! 2. The source fetches one batch (page 0 in replace mode, the next page in
//!    append mode).
//! 3. If the engine was unmounted meanwhile, the batch is discarded unmerged.
//! 4. The batch is validated as a whole: a record without identity rejects the
//!    batch and halts the engine.
//! 5. The batch is merged into the `RecordStore` and the new view is published.
//! 6. The admission is released on every path; an empty batch in append mode
//!    marks the feed exhausted.
//!
//! ## Modes:
//! - `SyncMode::Replace` re-reads the head of the feed on every request and has
//!   no exhaustion signal; empty batches change nothing.
//! - `SyncMode::Append` walks the pages forward; an empty page exhausts the feed
//!   for the lifetime of the engine.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::fetch_gate::{Admission, Completion, FetchGate, SyncState};
use crate::core::lock;
use crate::core::reconciler::MergeSummary;
use crate::core::source::{BatchRequest, FeedSource};
use crate::core::store::RecordStore;
use crate::core::triggers::{self, ScrollObserver, ScrollPosition, Trigger};
use crate::errors::SyncError;
use crate::model::{Record, records_from_batch};

/// Largest page the backend serves; bigger requests are clamped.
pub const MAX_PAGE_SIZE: u32 = 50;

/// How successive batches relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Every batch is the current head of the feed.
    Replace,
    /// Every batch is the next page.
    Append,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncMode::Replace => "replace",
            SyncMode::Append => "append",
        })
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(SyncMode::Replace),
            "append" => Ok(SyncMode::Append),
            other => Err(format!("unknown sync mode {other:?} (expected replace or append)")),
        }
    }
}

/// # Engine Configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Batch relationship and exhaustion behavior.
    pub mode: SyncMode,
    /// Period of the interval driver; `None` disables it.
    pub poll_interval: Option<Duration>,
    /// Distance from the end under which a scroll event fires.
    pub scroll_threshold: f64,
    /// Scroll evaluation rate limit.
    pub scroll_window: Duration,
    /// Records per request.
    pub page_size: u32,
}

impl EngineConfig {
    /// Defaults for a mode: replace polls every 10s, append every 40s.
    pub fn for_mode(mode: SyncMode) -> Self {
        Self {
            mode,
            poll_interval: Some(match mode {
                SyncMode::Replace => Duration::from_secs(10),
                SyncMode::Append => Duration::from_secs(40),
            }),
            scroll_threshold: 100.0,
            scroll_window: Duration::from_millis(300),
            page_size: 10,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_mode(SyncMode::Append)
    }
}

/// Result of a synchronization attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The gate refused: a request is in flight, the feed is exhausted, or the
    /// engine is unmounted.
    Denied,
    /// A batch was merged.
    Merged(MergeSummary),
    /// An empty batch exhausted the feed.
    Exhausted,
    /// The batch arrived after teardown and was dropped.
    Discarded,
}

struct FeedState {
    store: RecordStore,
    next_page: u32,
}

/// # Feed Engine
///
/// Owns the record store, the gate and the mount token. Shared as
/// `Arc<FeedEngine<S>>` between the drivers and the embedding application.
pub struct FeedEngine<S> {
    source: S,
    config: EngineConfig,
    gate: FetchGate,
    feed: Mutex<FeedState>,
    scroll: Mutex<ScrollObserver>,
    mounted: CancellationToken,
    view: watch::Sender<Arc<[Record]>>,
}

impl<S: FeedSource> FeedEngine<S> {
    /// Creates a mounted engine with an empty store. No request is made until a
    /// trigger fires or `synchronize` is called.
    pub fn new(source: S, config: EngineConfig) -> Self {
        let (view, _) = watch::channel(Arc::from(Vec::<Record>::new()));
        Self {
            gate: FetchGate::new(config.mode == SyncMode::Append),
            scroll: Mutex::new(ScrollObserver::new(config.scroll_threshold, config.scroll_window)),
            feed: Mutex::new(FeedState {
                store: RecordStore::new(),
                next_page: 0,
            }),
            mounted: CancellationToken::new(),
            source,
            config,
            view,
        }
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one synchronization attempt now.
    pub async fn synchronize(&self, trigger: Trigger) -> Result<SyncOutcome, SyncError> {
        if !self.is_mounted() {
            return Ok(SyncOutcome::Denied);
        }
        let Some(admission) = self.gate.try_admit() else {
            log::trace!("{trigger} sync denied by gate");
            return Ok(SyncOutcome::Denied);
        };
        self.run_admitted(admission, trigger).await
    }

    pub(crate) async fn run_admitted(
        &self,
        admission: Admission,
        trigger: Trigger,
    ) -> Result<SyncOutcome, SyncError> {
        let request = self.next_request();
        log::debug!("{trigger} sync admitted (page {}, size {})", request.page, request.size);

        let fetched = self.source.fetch_batch(request).await;

        if !self.is_mounted() {
            admission.release(Completion::Cancelled);
            log::debug!("{trigger} batch arrived after teardown; discarded");
            return Ok(SyncOutcome::Discarded);
        }

        let payloads = match fetched {
            Ok(payloads) => payloads,
            Err(err) => {
                log::warn!("{trigger} sync failed: {err}");
                admission.release(Completion::Failed(err.to_string()));
                return Err(err.into());
            }
        };

        let received = payloads.len();
        let records = match records_from_batch(payloads) {
            Ok(records) => records,
            Err(violation) => {
                log::error!("rejecting batch and halting feed synchronization: {violation}");
                admission.release(Completion::Failed(violation.to_string()));
                self.unmount();
                return Err(violation.into());
            }
        };

        if records.is_empty() {
            admission.release(Completion::Received(0));
            if self.gate.tracks_exhaustion() {
                log::info!("feed exhausted at page {}", request.page);
                return Ok(SyncOutcome::Exhausted);
            }
            return Ok(SyncOutcome::Merged(MergeSummary::default()));
        }

        let summary = {
            let mut feed = lock(&self.feed);
            // Teardown cancels the mount token under this lock.
            if !self.is_mounted() {
                drop(feed);
                admission.release(Completion::Cancelled);
                log::debug!("{trigger} batch arrived after teardown; discarded");
                return Ok(SyncOutcome::Discarded);
            }
            let summary = feed.store.merge_batch(records);
            if self.config.mode == SyncMode::Append {
                feed.next_page += 1;
            }
            self.publish(&feed.store);
            summary
        };
        admission.release(Completion::Received(received));
        Ok(SyncOutcome::Merged(summary))
    }

    fn next_request(&self) -> BatchRequest {
        let page = match self.config.mode {
            SyncMode::Replace => 0,
            SyncMode::Append => lock(&self.feed).next_page,
        };
        BatchRequest {
            page,
            size: self.config.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Feeds one scroll event to the throttled observer. `true` means the event
    /// should request a synchronization.
    pub fn observe_scroll(&self, position: ScrollPosition, now: Instant) -> bool {
        lock(&self.scroll).observe(position, now)
    }

    /// Puts a record the user just created at the front of the view, bypassing
    /// the reconciler.
    pub fn insert_created(&self, record: Record) {
        let mut feed = lock(&self.feed);
        let id = record.id.clone();
        if feed.store.prepend(record).is_some() {
            log::warn!("created record {id} was already in the feed; moved to front");
        }
        self.publish(&feed.store);
    }

    /// The materialized, display-ordered view.
    pub fn records(&self) -> Vec<Record> {
        lock(&self.feed).store.to_vec()
    }

    /// Receives every new view as it is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<[Record]>> {
        self.view.subscribe()
    }

    /// Current gate state (in flight, exhausted, error notice).
    pub fn sync_state(&self) -> SyncState {
        self.gate.state()
    }

    /// Dismisses the error notice.
    pub fn dismiss_error(&self) {
        self.gate.dismiss_error();
    }

    /// False after teardown or after a fatal contract violation.
    pub fn is_mounted(&self) -> bool {
        !self.mounted.is_cancelled()
    }

    /// Resolves once the engine is unmounted, by teardown or by a fatal halt.
    pub async fn unmounted(&self) {
        self.mounted.cancelled().await;
    }

    /// Tears the engine down: stops the drivers, discards throttle state and makes
    /// any batch still in flight land in the void. Idempotent.
    pub fn unmount(&self) {
        {
            let _feed = lock(&self.feed);
            self.mounted.cancel();
        }
        lock(&self.scroll).cancel();
    }

    /// Starts the interval and scroll drivers. Must be called inside a tokio
    /// runtime.
    pub fn mount(self: Arc<Self>) -> EngineHandle<S> {
        let tracker = TaskTracker::new();
        let (scroll_tx, scroll_rx) = mpsc::unbounded_channel();

        if let Some(period) = self.config.poll_interval {
            tracker.spawn(triggers::run_interval_driver(Arc::clone(&self), period, tracker.clone()));
        }
        tracker.spawn(triggers::run_scroll_driver(Arc::clone(&self), scroll_rx, tracker.clone()));
        log::info!("feed engine mounted in {} mode", self.config.mode);

        EngineHandle {
            engine: self,
            scroll_tx,
            tracker,
        }
    }

    pub(crate) fn gate(&self) -> &FetchGate {
        &self.gate
    }

    pub(crate) fn mount_token(&self) -> &CancellationToken {
        &self.mounted
    }

    fn publish(&self, store: &RecordStore) {
        self.view.send_replace(Arc::from(store.to_vec()));
    }
}

/// Handle to a mounted engine and its driver tasks. Dropping it unmounts.
pub struct EngineHandle<S: FeedSource> {
    engine: Arc<FeedEngine<S>>,
    scroll_tx: mpsc::UnboundedSender<ScrollPosition>,
    tracker: TaskTracker,
}

impl<S: FeedSource> EngineHandle<S> {
    /// The shared engine.
    pub fn engine(&self) -> &Arc<FeedEngine<S>> {
        &self.engine
    }

    /// Reports a scroll position. Returns `false` once the engine is unmounted.
    pub fn scroll(&self, position: ScrollPosition) -> bool {
        self.engine.is_mounted() && self.scroll_tx.send(position).is_ok()
    }

    /// Unmounts and waits for the drivers and any fetch task to finish.
    pub async fn shutdown(self) {
        self.engine.unmount();
        self.tracker.close();
        self.tracker.wait().await;
        log::info!("feed engine unmounted");
    }
}

impl<S: FeedSource> Drop for EngineHandle<S> {
    fn drop(&mut self) {
        self.engine.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceError;
    use crate::model::{RecordId, TweetPayload, UserRef};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn payload(id: i64, content: &str) -> TweetPayload {
        TweetPayload {
            id: Some(RecordId::from(id)),
            content: content.to_string(),
            user: Some(UserRef { id: None, username: "ada".into(), role: None }),
            timestamp: None,
        }
    }

    type Scripted = Result<Vec<TweetPayload>, SourceError>;

    /// Replays scripted responses and records the requests it saw. When the
    /// script runs out it returns empty batches. With `hold` set, every fetch
    /// waits for a notification before answering.
    #[derive(Default)]
    struct ScriptedSource {
        script: Mutex<VecDeque<Scripted>>,
        requests: Mutex<Vec<BatchRequest>>,
        calls: AtomicUsize,
        hold: Option<Arc<Notify>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Scripted>) -> Self {
            Self { script: Mutex::new(script.into()), ..Default::default() }
        }

        fn held(script: Vec<Scripted>, gate: Arc<Notify>) -> Self {
            Self { hold: Some(gate), ..Self::new(script) }
        }

        fn pages(&self) -> Vec<u32> {
            lock(&self.requests).iter().map(|r| r.page).collect()
        }
    }

    impl FeedSource for ScriptedSource {
        async fn fetch_batch(&self, request: BatchRequest) -> Result<Vec<TweetPayload>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            lock(&self.requests).push(request);
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            lock(&self.script).pop_front().unwrap_or(Ok(Vec::new()))
        }
    }

    fn engine(mode: SyncMode, script: Vec<Scripted>) -> FeedEngine<ScriptedSource> {
        FeedEngine::new(ScriptedSource::new(script), EngineConfig::for_mode(mode))
    }

    fn contents(engine: &FeedEngine<ScriptedSource>) -> Vec<String> {
        engine.records().into_iter().map(|r| r.content).collect()
    }

    #[tokio::test]
    async fn append_mode_walks_pages_and_exhausts_on_empty_batch() {
        let engine = engine(
            SyncMode::Append,
            vec![Ok(vec![payload(1, "a"), payload(2, "b")]), Ok(vec![payload(3, "c")]), Ok(vec![])],
        );

        assert!(matches!(engine.synchronize(Trigger::Manual).await, Ok(SyncOutcome::Merged(_))));
        assert!(matches!(engine.synchronize(Trigger::Manual).await, Ok(SyncOutcome::Merged(_))));
        assert_eq!(engine.synchronize(Trigger::Manual).await, Ok(SyncOutcome::Exhausted));

        assert_eq!(engine.source.pages(), vec![0, 1, 2]);
        assert_eq!(contents(&engine), ["a", "b", "c"]);
        assert!(engine.sync_state().exhausted);

        for trigger in [Trigger::Interval, Trigger::Scroll, Trigger::Manual] {
            assert_eq!(engine.synchronize(trigger).await, Ok(SyncOutcome::Denied));
        }
        assert_eq!(engine.source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn replace_mode_rereads_head_and_never_exhausts() {
        let engine = engine(
            SyncMode::Replace,
            vec![
                Ok(vec![payload(1, "a"), payload(2, "b")]),
                Ok(vec![]),
                Ok(vec![payload(3, "c"), payload(1, "a edited")]),
            ],
        );

        engine.synchronize(Trigger::Interval).await.unwrap();
        let empty = engine.synchronize(Trigger::Interval).await.unwrap();
        assert_eq!(empty, SyncOutcome::Merged(MergeSummary::default()));
        let third = engine.synchronize(Trigger::Interval).await.unwrap();
        assert_eq!(third, SyncOutcome::Merged(MergeSummary { received: 2, added: 1, updated: 1 }));

        assert_eq!(engine.source.pages(), vec![0, 0, 0]);
        assert_eq!(contents(&engine), ["a edited", "b", "c"]);
        assert!(!engine.sync_state().exhausted);
    }

    #[tokio::test]
    async fn failure_resets_in_flight_and_next_trigger_is_admitted() {
        let engine = engine(
            SyncMode::Append,
            vec![Err(SourceError::Unauthorized { status: 401 }), Ok(vec![payload(1, "a")])],
        );

        let err = engine.synchronize(Trigger::Scroll).await.unwrap_err();
        assert_eq!(err, SyncError::Source(SourceError::Unauthorized { status: 401 }));
        let state = engine.sync_state();
        assert!(!state.in_flight);
        assert!(!state.exhausted);
        assert_eq!(state.last_error.as_deref(), Some("not authorized (HTTP 401)"));

        assert!(matches!(engine.synchronize(Trigger::Scroll).await, Ok(SyncOutcome::Merged(_))));
        // The failed page is requested again.
        assert_eq!(engine.source.pages(), vec![0, 0]);
    }

    #[tokio::test]
    async fn record_without_identity_rejects_batch_and_halts() {
        let mut bad = payload(2, "b");
        bad.id = None;
        let engine = engine(
            SyncMode::Append,
            vec![Ok(vec![payload(1, "a")]), Ok(vec![payload(3, "c"), bad])],
        );

        engine.synchronize(Trigger::Manual).await.unwrap();
        let err = engine.synchronize(Trigger::Manual).await.unwrap_err();
        assert!(err.is_fatal());

        assert_eq!(contents(&engine), ["a"]);
        assert!(!engine.is_mounted());
        assert!(!engine.sync_state().in_flight);
        assert!(engine.sync_state().last_error.is_some());
        assert_eq!(engine.synchronize(Trigger::Manual).await, Ok(SyncOutcome::Denied));
    }

    #[tokio::test]
    async fn created_record_is_prepended_and_published() {
        let engine = engine(SyncMode::Append, vec![Ok(vec![payload(1, "a"), payload(2, "b")])]);
        let mut view = engine.subscribe();

        engine.synchronize(Trigger::Manual).await.unwrap();
        engine.insert_created(Record::new(10_i64, "mine", "me"));

        assert_eq!(contents(&engine), ["mine", "a", "b"]);
        assert!(view.has_changed().unwrap());
        assert_eq!(view.borrow_and_update().len(), 3);
    }

    #[tokio::test]
    async fn concurrent_trigger_is_denied_while_fetch_is_in_flight() {
        let release = Arc::new(Notify::new());
        let engine = Arc::new(FeedEngine::new(
            ScriptedSource::held(vec![Ok(vec![payload(1, "a")])], Arc::clone(&release)),
            EngineConfig::for_mode(SyncMode::Append),
        ));

        let first = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.synchronize(Trigger::Interval).await }
        });
        while !engine.sync_state().in_flight {
            tokio::task::yield_now().await;
        }

        assert_eq!(engine.synchronize(Trigger::Scroll).await, Ok(SyncOutcome::Denied));
        release.notify_one();
        assert!(matches!(first.await.unwrap(), Ok(SyncOutcome::Merged(_))));
        assert_eq!(engine.source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn batch_completing_after_unmount_is_discarded() {
        let release = Arc::new(Notify::new());
        let engine = Arc::new(FeedEngine::new(
            ScriptedSource::held(vec![Ok(vec![payload(1, "a")])], Arc::clone(&release)),
            EngineConfig::for_mode(SyncMode::Append),
        ));

        let pending = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.synchronize(Trigger::Manual).await }
        });
        while !engine.sync_state().in_flight {
            tokio::task::yield_now().await;
        }

        engine.unmount();
        release.notify_one();
        assert_eq!(pending.await.unwrap(), Ok(SyncOutcome::Discarded));
        assert!(engine.records().is_empty());
        assert!(!engine.sync_state().in_flight);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unmount_racing_the_merge_discards_the_batch() {
        let release = Arc::new(Notify::new());
        let engine = Arc::new(FeedEngine::new(
            ScriptedSource::held(vec![Ok(vec![payload(1, "a")])], Arc::clone(&release)),
            EngineConfig::for_mode(SyncMode::Append),
        ));

        let pending = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.synchronize(Trigger::Manual).await }
        });
        while !engine.sync_state().in_flight {
            tokio::task::yield_now().await;
        }

        // Park the fetch task on the store lock after its first mounted check,
        // then cancel the way `unmount` does while holding that lock.
        let feed = lock(&engine.feed);
        release.notify_one();
        std::thread::sleep(Duration::from_millis(200));
        engine.mounted.cancel();
        drop(feed);

        assert_eq!(pending.await.unwrap(), Ok(SyncOutcome::Discarded));
        assert!(!engine.is_mounted());
        assert!(engine.records().is_empty());
        assert!(!engine.sync_state().in_flight);
        assert_eq!(engine.next_request().page, 0);
    }

    fn at_end() -> ScrollPosition {
        ScrollPosition::at_end(600.0, 2_000.0)
    }

    #[tokio::test(start_paused = true)]
    async fn mount_loads_immediately_then_polls_on_the_interval() {
        let engine = Arc::new(engine(SyncMode::Replace, vec![Ok(vec![payload(1, "a")])]));
        let handle = Arc::clone(&engine).mount();

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(engine.source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(contents(&engine), ["a"]);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(engine.source.calls.load(Ordering::SeqCst), 2);

        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(engine.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn scroll_burst_inside_one_window_fetches_once() {
        let mut config = EngineConfig::for_mode(SyncMode::Append);
        config.poll_interval = None;
        let engine = Arc::new(FeedEngine::new(
            ScriptedSource::new(vec![Ok(vec![payload(1, "a")]), Ok(vec![payload(2, "b")])]),
            config,
        ));
        let handle = Arc::clone(&engine).mount();

        assert!(handle.scroll(at_end()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.scroll(at_end()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.source.calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(handle.scroll(at_end()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(engine.source.pages(), vec![0, 1]);
        assert_eq!(contents(&engine), ["a", "b"]);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn scroll_far_from_end_does_not_fetch() {
        let mut config = EngineConfig::for_mode(SyncMode::Append);
        config.poll_interval = None;
        let engine = Arc::new(FeedEngine::new(ScriptedSource::default(), config));
        let handle = Arc::clone(&engine).mount();

        assert!(handle.scroll(ScrollPosition { offset: 0.0, viewport: 600.0, content_height: 2_000.0 }));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(engine.source.calls.load(Ordering::SeqCst), 0);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_the_fetch_in_flight() {
        let release = Arc::new(Notify::new());
        let mut config = EngineConfig::for_mode(SyncMode::Append);
        config.poll_interval = None;
        let engine = Arc::new(FeedEngine::new(
            ScriptedSource::held(vec![Ok(vec![payload(1, "a")])], Arc::clone(&release)),
            config,
        ));
        let handle = Arc::clone(&engine).mount();

        assert!(handle.scroll(at_end()));
        while !engine.sync_state().in_flight {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        handle.shutdown().await;
        release.notify_one();
        tokio::task::yield_now().await;

        assert!(!engine.is_mounted());
        assert!(!engine.sync_state().in_flight);
        assert!(engine.records().is_empty());
        assert_eq!(engine.synchronize(Trigger::Manual).await, Ok(SyncOutcome::Denied));
    }

    #[tokio::test(start_paused = true)]
    async fn contract_violation_stops_the_drivers() {
        let mut bad = payload(1, "a");
        bad.id = None;
        let engine = Arc::new(engine(SyncMode::Replace, vec![Ok(vec![bad])]));
        let handle = Arc::clone(&engine).mount();

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(engine.source.calls.load(Ordering::SeqCst), 1);
        assert!(!engine.is_mounted());
        assert!(!handle.scroll(at_end()));
        handle.shutdown().await;
    }

    #[test]
    fn page_size_is_clamped_to_backend_limit() {
        let mut config = EngineConfig::for_mode(SyncMode::Append);
        config.page_size = 500;
        let engine = FeedEngine::new(ScriptedSource::default(), config);
        assert_eq!(engine.config().page_size, 500);
        assert_eq!(engine.next_request(), BatchRequest { page: 0, size: MAX_PAGE_SIZE });
    }

    #[test]
    fn sync_mode_parses_case_insensitively() {
        assert_eq!("Replace".parse::<SyncMode>(), Ok(SyncMode::Replace));
        assert_eq!(" append ".parse::<SyncMode>(), Ok(SyncMode::Append));
        assert!("merge".parse::<SyncMode>().is_err());
    }
}
