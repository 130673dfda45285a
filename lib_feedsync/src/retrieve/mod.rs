//! # Data Retrieval Module
//!
//! The HTTP layer shared by every endpoint client: request building, bearer
//! authentication, optional retries and the mapping of HTTP outcomes onto
//! `SourceError`. Endpoint wrappers in `endpoints` only describe paths and
//! payloads.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: `ApiClient` built on `reqwest` and `reqwest-middleware`, with
//!   `reqwest-retry` backoff available through `ClientOptions`.

/// Generic HTTP API client with optional retry middleware.
pub mod ky_http;

pub use ky_http::{ApiClient, ApiResponse, ClientOptions, status_error};
