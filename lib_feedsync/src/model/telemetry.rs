//! # Cache Telemetry Model
//!
//! Data structures for the remote cache's aggregate statistics, as reported by
//! the `api/cache/stats` endpoint. A snapshot is a read-only mirror of server
//! state: it is replaced wholesale on every successful poll and never merged.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// # Telemetry Snapshot
///
/// Occupancy, hit/miss counters and the most frequently accessed keys of the
/// remote user cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    /// Number of entries currently cached.
    pub size: u64,
    /// Capacity before eviction starts.
    pub max_size: u64,
    /// Lookups served since the server started. Older servers omit it.
    #[serde(default)]
    pub total_requests: u64,
    /// Fraction of lookups served from the cache, in `[0, 1]`.
    pub hit_rate: f64,
    /// Lookups served from the cache.
    pub cache_hits: u64,
    /// Lookups that fell through to the database.
    pub cache_misses: u64,
    /// Hottest keys, most hits first, as ordered by the server.
    #[serde(default)]
    pub most_accessed_users: Vec<AccessedUser>,
}

impl TelemetrySnapshot {
    /// The hit rate as a percentage with one decimal, e.g. `"87.5%"`.
    pub fn hit_rate_percent(&self) -> String {
        format!("{:.1}%", self.hit_rate * 100.0)
    }

    /// Single-line summary used by the console watcher.
    pub fn summary(&self) -> String {
        format!(
            "size {}/{} | hit rate {} | hits {} | misses {}",
            self.size,
            self.max_size,
            self.hit_rate_percent(),
            self.cache_hits,
            self.cache_misses
        )
    }
}

/// One entry of the "most accessed" list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessedUser {
    /// Cache key (a username).
    pub username: String,
    /// Hits recorded for this key.
    pub hits: u64,
    /// Last access, sent by the server as Unix milliseconds.
    #[serde(default, deserialize_with = "deserialize_ms_to_utc")]
    pub last_accessed: Option<DateTime<Utc>>,
}

/// Converts an optional Unix millisecond timestamp into `DateTime<Utc>`.
fn deserialize_ms_to_utc<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let ms: Option<i64> = Option::deserialize(deserializer)?;
    match ms {
        None => Ok(None),
        Some(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {ms}"))),
    }
}
