//! # Data Model
//!
//! Plain data shared by the engine, the telemetry reader and the endpoint clients.

/// Feed records, their identity and the tweet wire payload.
pub mod record;
/// Cache statistics snapshot.
pub mod telemetry;
/// Bearer credential.
pub mod credential;

pub use credential::Credential;
pub use record::{MAX_CONTENT_CHARS, Record, RecordId, TweetPayload, UserRef, records_from_batch};
pub use telemetry::{AccessedUser, TelemetrySnapshot};
