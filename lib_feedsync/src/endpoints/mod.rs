//! # REST Endpoints
//!
//! One-shot request/response wrappers over `ApiClient` for the social-feed
//! backend. None of them keep state between calls; the credential lives in the
//! `ApiClient` they are built from.
//!
//! - **`feed`**: feed batches (`FeedSource`) and per-user timelines.
//! - **`tweets`**: tweet creation with local validation.
//! - **`cache_stats`**: cache statistics (`StatsSource`).
//! - **`auth`**: login, registration, logout.
//! - **`search`**: user lookup with the user's tweets.

use serde::Deserialize;

use crate::errors::ValidationError;

/// Login, registration and logout.
pub mod auth;
/// Cache statistics.
pub mod cache_stats;
/// Feed pages and user timelines.
pub mod feed;
/// User search.
pub mod search;
/// Tweet creation.
pub mod tweets;

pub use auth::{AuthClient, Session};
pub use cache_stats::CacheStatsEndpoint;
pub use feed::{FeedBody, FeedEndpoint, FeedPage};
pub use search::{FoundUser, SearchResult, UserSearch};
pub use tweets::TweetComposer;

/// `{"error": "..."}` bodies returned by the backend on 4xx.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Extracts the server's message from an error body, if it has one.
pub(crate) fn server_message(body: Option<&str>) -> Option<String> {
    body.and_then(|b| serde_json::from_str::<ErrorBody>(b).ok())
        .map(|e| e.error)
        .filter(|m| !m.trim().is_empty())
}

/// Trims `raw` and rejects it when blank or longer than `max` characters.
pub(crate) fn bounded_text(field: &'static str, raw: &str, max: usize) -> Result<String, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    let len = text.chars().count();
    if len > max {
        return Err(ValidationError::TooLong { field, max, len });
    }
    Ok(text.to_string())
}

/// Usernames are letters, digits, `_` and `.`.
pub(crate) fn username(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::Empty("username"));
    }
    // All-dot names would turn into `.`/`..` path segments.
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') || name.chars().all(|c| c == '.') {
        return Err(ValidationError::BadCharacters("username"));
    }
    Ok(name.to_string())
}
