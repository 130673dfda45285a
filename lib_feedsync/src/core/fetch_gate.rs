//! # Fetch Gate
//!
//! Serializes synchronization requests coming from independent triggers (interval
//! ticks, scroll events) into a single stream with at most one request in flight.
//!
//! ## Contract:
//! - `try_admit` returns `None` while a request is in flight or once the feed is
//!   exhausted. Otherwise it marks the gate busy and hands out an `Admission`.
//! - Denied triggers are dropped, never queued.
//! - Every `Admission` is settled exactly once: explicitly through `release`, or
//!   as `Completion::Cancelled` when it is dropped unreleased (task aborted,
//!   future cancelled on teardown, early return). Either way `in_flight` resets,
//!   so a failure can never wedge the gate.
//! - `Completion::Received(0)` sets `exhausted` when exhaustion tracking is on.
//!   Nothing clears it; a new gate is needed.

use std::sync::{Arc, Mutex};

use crate::core::lock;

/// Observable synchronization state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    /// A request has been admitted and not yet settled.
    pub in_flight: bool,
    /// The remote side reported no further records.
    pub exhausted: bool,
    /// Message of the most recent failure, shown as a dismissible notice.
    pub last_error: Option<String>,
}

/// How an admitted request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The fetch returned a batch of `n` records.
    Received(usize),
    /// The fetch failed with a user-displayable message.
    Failed(String),
    /// The request was abandoned (teardown, discarded result).
    Cancelled,
}

/// # Fetch Gate
///
/// Cheap to clone; clones share the same state.
#[derive(Debug, Clone)]
pub struct FetchGate {
    state: Arc<Mutex<SyncState>>,
    track_exhaustion: bool,
}

impl FetchGate {
    /// Creates an open gate. With `track_exhaustion == false` an empty batch
    /// never closes it.
    pub fn new(track_exhaustion: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(SyncState::default())),
            track_exhaustion,
        }
    }

    /// Admits a request if none is in flight and the feed is not exhausted.
    ///
    /// Admission replaces any previous error notice.
    pub fn try_admit(&self) -> Option<Admission> {
        let mut state = lock(&self.state);
        if state.in_flight || state.exhausted {
            return None;
        }
        state.in_flight = true;
        state.last_error = None;
        Some(Admission {
            state: Arc::clone(&self.state),
            track_exhaustion: self.track_exhaustion,
            settled: false,
        })
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SyncState {
        lock(&self.state).clone()
    }

    /// Clears the error notice.
    pub fn dismiss_error(&self) {
        lock(&self.state).last_error = None;
    }

    /// Whether empty batches close the gate.
    pub fn tracks_exhaustion(&self) -> bool {
        self.track_exhaustion
    }
}

/// Permission to run one synchronization request. Settles on drop.
#[must_use = "dropping an Admission immediately releases it as cancelled"]
#[derive(Debug)]
pub struct Admission {
    state: Arc<Mutex<SyncState>>,
    track_exhaustion: bool,
    settled: bool,
}

impl Admission {
    /// Settles the request with its outcome and reopens the gate.
    pub fn release(mut self, completion: Completion) {
        self.settle(completion);
    }

    fn settle(&mut self, completion: Completion) {
        if self.settled {
            return;
        }
        self.settled = true;

        let mut state = lock(&self.state);
        state.in_flight = false;
        match completion {
            Completion::Received(0) if self.track_exhaustion => state.exhausted = true,
            Completion::Received(_) | Completion::Cancelled => {}
            Completion::Failed(message) => state.last_error = Some(message),
        }
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.settle(Completion::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn second_admission_is_denied_until_release() {
        let gate = FetchGate::new(true);
        let first = gate.try_admit().expect("open gate admits");
        assert!(gate.try_admit().is_none());
        assert!(gate.state().in_flight);

        first.release(Completion::Received(3));
        assert!(!gate.state().in_flight);
        assert!(gate.try_admit().is_some());
    }

    #[test]
    fn failure_reopens_gate_and_records_error() {
        let gate = FetchGate::new(true);
        gate.try_admit().unwrap().release(Completion::Failed("HTTP 500".into()));

        let state = gate.state();
        assert!(!state.in_flight);
        assert!(!state.exhausted);
        assert_eq!(state.last_error.as_deref(), Some("HTTP 500"));

        gate.dismiss_error();
        assert_eq!(gate.state().last_error, None);
    }

    #[test]
    fn admission_replaces_previous_error() {
        let gate = FetchGate::new(true);
        gate.try_admit().unwrap().release(Completion::Failed("boom".into()));
        let _next = gate.try_admit().unwrap();
        assert_eq!(gate.state().last_error, None);
    }

    #[test]
    fn dropped_admission_releases_as_cancelled() {
        let gate = FetchGate::new(true);
        {
            let _admission = gate.try_admit().unwrap();
        }
        let state = gate.state();
        assert!(!state.in_flight);
        assert!(!state.exhausted);
        assert!(gate.try_admit().is_some());
    }

    #[test]
    fn empty_batch_exhausts_only_when_tracked() {
        let tracked = FetchGate::new(true);
        tracked.try_admit().unwrap().release(Completion::Received(0));
        assert!(tracked.state().exhausted);
        assert!(tracked.try_admit().is_none());

        let untracked = FetchGate::new(false);
        untracked.try_admit().unwrap().release(Completion::Received(0));
        assert!(!untracked.state().exhausted);
        assert!(untracked.try_admit().is_some());
    }

    #[derive(Debug, Clone)]
    enum Op {
        IntervalTick,
        ScrollEvent,
        Complete(usize),
        Fail,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::IntervalTick),
            Just(Op::ScrollEvent),
            (0_usize..3).prop_map(Op::Complete),
            Just(Op::Fail),
        ]
    }

    proptest! {
        #[test]
        fn property_at_most_one_admission_and_exhaustion_is_sticky(ops in prop::collection::vec(op(), 1..60)) {
            let gate = FetchGate::new(true);
            let mut outstanding: Option<Admission> = None;
            let mut exhausted = false;

            for op in ops {
                match op {
                    Op::IntervalTick | Op::ScrollEvent => {
                        let admitted = gate.try_admit();
                        let expected = outstanding.is_none() && !exhausted;
                        prop_assert_eq!(admitted.is_some(), expected);
                        if let Some(admission) = admitted {
                            outstanding = Some(admission);
                        }
                    }
                    Op::Complete(n) => {
                        if let Some(admission) = outstanding.take() {
                            admission.release(Completion::Received(n));
                            exhausted |= n == 0;
                        }
                    }
                    Op::Fail => {
                        if let Some(admission) = outstanding.take() {
                            admission.release(Completion::Failed("x".into()));
                        }
                    }
                }
                prop_assert_eq!(gate.state().in_flight, outstanding.is_some());
                prop_assert_eq!(gate.state().exhausted, exhausted);
            }
        }
    }
}
