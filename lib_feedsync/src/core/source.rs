//! The seam between the engine and whatever produces batches.
//!
//! The HTTP implementation lives in `endpoints::feed`; tests plug in in-memory
//! sources. The credential is a property of the source, handed to it at
//! construction, never looked up by the engine.

use std::future::Future;
use std::sync::Arc;

use crate::errors::SourceError;
use crate::model::TweetPayload;

/// One page request. In replace mode `page` is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRequest {
    /// Zero-based page index.
    pub page: u32,
    /// Records per page.
    pub size: u32,
}

/// Produces batches of feed records.
pub trait FeedSource: Send + Sync + 'static {
    /// Fetches one batch. An empty batch means "nothing more".
    fn fetch_batch(
        &self,
        request: BatchRequest,
    ) -> impl Future<Output = Result<Vec<TweetPayload>, SourceError>> + Send;
}

impl<S: FeedSource> FeedSource for Arc<S> {
    fn fetch_batch(
        &self,
        request: BatchRequest,
    ) -> impl Future<Output = Result<Vec<TweetPayload>, SourceError>> + Send {
        (**self).fetch_batch(request)
    }
}
