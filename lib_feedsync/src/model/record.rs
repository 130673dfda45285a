//! # Feed Record Model
//!
//! Strongly-typed representation of one feed item and of the JSON shape the
//! tweet endpoints return for it.
//!
//! ## Key Points:
//! - **Wire vs. domain**: `TweetPayload` mirrors the server JSON and tolerates
//!   missing fields. `Record` is what the engine stores; it always has an identity.
//! - **Identity check at the boundary**: converting a payload without an `id`
//!   yields a `ContractViolation`, which the engine treats as fatal.
//! - **Timestamp normalization**: the server emits ISO local date-times; RFC 3339
//!   values with an offset are accepted too and normalized to UTC.

use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::ContractViolation;

/// Upper bound on tweet content, counted in characters.
pub const MAX_CONTENT_CHARS: usize = 280;

/// Author shown when the server omits the user.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// # Record Identity
///
/// Opaque, stable identity of a feed record. The backend uses 64-bit integer ids,
/// but nothing in the client relies on that, so both JSON numbers and strings decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Borrows the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => RecordId::from(n),
            RawId::Text(s) => RecordId(s),
        })
    }
}

/// The author block embedded in every tweet payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Server-side user id, when present.
    #[serde(default)]
    pub id: Option<i64>,
    /// Display name of the author.
    pub username: String,
    /// Role string (e.g. `USER`), when present.
    #[serde(default)]
    pub role: Option<String>,
}

/// # Tweet Payload
///
/// The tweet JSON as the server sends it. Every field may be absent at this layer;
/// the identity requirement is enforced by `Record::try_from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweetPayload {
    /// Record identity. Its absence is a contract violation.
    #[serde(default)]
    pub id: Option<RecordId>,
    /// Tweet text.
    #[serde(default)]
    pub content: String,
    /// Author, embedded by the server.
    #[serde(default)]
    pub user: Option<UserRef>,
    /// Creation time as reported by the server.
    #[serde(default, deserialize_with = "deserialize_flexible_timestamp")]
    pub timestamp: Option<NaiveDateTime>,
}

/// # Record
///
/// One immutable feed item. The client never edits these fields; it only adds,
/// replaces or orders whole records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Stable identity, unique within a store.
    pub id: RecordId,
    /// Bounded text content.
    pub content: String,
    /// Author display name.
    pub author: String,
    /// Creation time, if the server supplied one.
    pub created_at: Option<NaiveDateTime>,
}

impl Record {
    /// Builds a record directly. Used by tests and by callers that already hold
    /// validated data.
    pub fn new(id: impl Into<RecordId>, content: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            author: author.into(),
            created_at: None,
        }
    }
}

impl TryFrom<TweetPayload> for Record {
    type Error = ContractViolation;

    fn try_from(payload: TweetPayload) -> Result<Self, Self::Error> {
        let id = payload.id.ok_or(ContractViolation::MissingId { position: 0 })?;
        Ok(Self {
            id,
            content: payload.content,
            author: payload
                .user
                .map(|u| u.username)
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            created_at: payload.timestamp,
        })
    }
}

/// Converts a whole batch, failing on the first payload without identity.
///
/// The reported position is the payload's index within the batch, so the store is
/// never touched by a partially valid batch.
pub fn records_from_batch(batch: Vec<TweetPayload>) -> Result<Vec<Record>, ContractViolation> {
    batch
        .into_iter()
        .enumerate()
        .map(|(position, payload)| {
            Record::try_from(payload).map_err(|_| ContractViolation::MissingId { position })
        })
        .collect()
}

/// Accepts `2024-05-01T12:30:00`, `2024-05-01T12:30:00.123456` and RFC 3339
/// strings with an offset. `null` or an absent field decode to `None`.
fn deserialize_flexible_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Some(naive));
    }
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| Some(dt.naive_utc()))
        .map_err(|e| serde::de::Error::custom(format!("unrecognized timestamp {raw:?}: {e}")))
}
