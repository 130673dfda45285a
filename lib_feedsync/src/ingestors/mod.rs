//! # Ingestors
//!
//! Self-scheduling readers for remote data that is mirrored, not reconciled.
//!
//! - **`telemetry_polling`**: the cache statistics reader and its `StatsSource`
//!   seam.

/// Periodic reader for the remote cache statistics.
pub mod telemetry_polling;

pub use telemetry_polling::{DEFAULT_TELEMETRY_PERIOD, StatsSource, TelemetryReader};
