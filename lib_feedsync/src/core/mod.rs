//! # Core
//!
//! The synchronization engine and its parts. Nothing in here performs I/O
//! directly; remote access goes through the `FeedSource` seam.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Orchestration: modes, configuration, mount/unmount and the merge step.
pub mod engine;
/// Single-flight admission and exhaustion tracking.
pub mod fetch_gate;
/// Pure last-write-wins batch merge.
pub mod reconciler;
/// The `FeedSource` trait.
pub mod source;
/// Ordered, deduplicated record storage.
pub mod store;
/// Leading-edge rate limiter.
pub mod throttle;
/// Interval and scroll drivers.
pub mod triggers;

pub use engine::{EngineConfig, EngineHandle, FeedEngine, MAX_PAGE_SIZE, SyncMode, SyncOutcome};
pub use fetch_gate::{Admission, Completion, FetchGate, SyncState};
pub use reconciler::{MergeSummary, merge};
pub use source::{BatchRequest, FeedSource};
pub use store::RecordStore;
pub use throttle::Throttle;
pub use triggers::{ScrollObserver, ScrollPosition, Trigger};

/// Locks a mutex, recovering the data if a holder panicked. Every critical
/// section in this crate leaves its state consistent, so poisoning carries no
/// information worth propagating.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
