//! # lib_feedsync
//!
//! Keeps a local, deduplicated, ordered view of a remote social feed in sync,
//! and mirrors the backend's cache statistics next to it.
//!
//! Always built:
//! - `model`: records, wire payloads, credential, telemetry snapshot.
//! - `core`: the feed synchronization engine.
//! - `ingestors`: the telemetry reader.
//! - `errors`: the error taxonomy.
//!
//! Behind features:
//! - `retrieve`: `ApiClient` and the REST endpoint clients.
//! - `loggers`: fern log setup.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod core;
pub mod errors;
pub mod ingestors;
pub mod model;

#[cfg(feature = "retrieve")]
pub mod endpoints;
#[cfg(feature = "retrieve")]
pub mod retrieve;

#[cfg(feature = "loggers")]
pub mod loggers;

pub use crate::core::{EngineConfig, EngineHandle, FeedEngine, ScrollPosition, SyncMode, SyncOutcome, Trigger};
pub use errors::{SourceError, SyncError};
pub use ingestors::{StatsSource, TelemetryReader};
pub use model::{Credential, Record, RecordId, TelemetrySnapshot};
