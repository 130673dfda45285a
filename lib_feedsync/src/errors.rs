//! # Error Taxonomy
//!
//! - `SourceError`: transport, authorization and decoding failures of a remote
//!   call. Recoverable; the next trigger may retry.
//! - `ContractViolation`: the server broke the record contract (a record without
//!   identity). Fatal for the feed engine.
//! - `SyncError`: what a synchronization attempt can fail with.
//! - `ValidationError`, `ComposeError`, `AuthError`, `SearchError`: boundary
//!   clients.

use thiserror::Error;

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The server refused the credential (401/403).
    #[error("not authorized (HTTP {status})")]
    Unauthorized {
        /// HTTP status code.
        status: u16,
    },

    /// Any other non-2xx response.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body, possibly empty.
        body: String,
    },

    /// The request never produced a response (connect, DNS, timeout, bad URL).
    #[error("transport failure: {0}")]
    Transport(String),

    /// A 2xx response whose body could not be decoded.
    #[error("undecodable response: {0}")]
    Decode(String),
}

/// The remote side sent a record the client cannot key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// Record at `position` in its batch has no `id`.
    #[error("record at batch position {position} has no identity")]
    MissingId {
        /// Index within the offending batch.
        position: usize,
    },
}

/// Failure of one synchronization attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The fetch failed; state is intact and the next trigger may retry.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The batch was rejected as a whole and the engine halted.
    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

impl SyncError {
    /// Whether the engine stops synchronizing after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Contract(_))
    }
}

/// Local validation of user-supplied input before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Blank after trimming.
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Longer than the allowed number of characters.
    #[error("{field} cannot exceed {max} characters (got {len})")]
    TooLong {
        /// Which input.
        field: &'static str,
        /// Allowed maximum.
        max: usize,
        /// Actual length.
        len: usize,
    },

    /// Contains characters outside letters, digits, `_` and `.`.
    #[error("{0} may only contain letters, digits, underscores and dots")]
    BadCharacters(&'static str),
}

/// Failure to publish a tweet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// Rejected locally.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Rejected by the server with a message.
    #[error("tweet rejected: {0}")]
    Rejected(String),

    /// The call itself failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The server answered with a record the client cannot key.
    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

/// Failure of login, registration or logout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Rejected locally.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The server answered with an `{"error": ...}` body.
    #[error("{0}")]
    Rejected(String),

    /// The call itself failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Failure of a user search.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Rejected locally.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// No such user.
    #[error("user {0} not found")]
    NotFound(String),

    /// The call itself failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The server answered with a record the client cannot key.
    #[error(transparent)]
    Contract(#[from] ContractViolation),
}
