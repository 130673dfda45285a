//! Feed pages: `GET api/tweets?page=&size=` and `GET api/tweets/user/{username}`.
//!
//! The backend answers with a paged envelope (`{content, last, number,
//! totalPages}`); a bare JSON array is accepted too. Both decode to one batch.

use serde::Deserialize;

use crate::core::{BatchRequest, FeedSource};
use crate::endpoints::username;
use crate::errors::{SearchError, SourceError};
use crate::model::{Record, TweetPayload, records_from_batch};
use crate::retrieve::ApiClient;

/// A page envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    /// Tweets on this page.
    pub content: Vec<TweetPayload>,
    /// Whether this is the final page.
    #[serde(default)]
    pub last: Option<bool>,
    /// Zero-based page number.
    #[serde(default)]
    pub number: Option<u32>,
    /// Total number of pages.
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// Either body shape of the feed endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FeedBody {
    /// A bare array.
    List(Vec<TweetPayload>),
    /// A page envelope.
    Page(FeedPage),
}

impl FeedBody {
    /// The tweets, whatever the shape.
    pub fn into_batch(self) -> Vec<TweetPayload> {
        match self {
            FeedBody::List(tweets) => tweets,
            FeedBody::Page(page) => page.content,
        }
    }
}

/// The main feed, as a `FeedSource`.
#[derive(Clone)]
pub struct FeedEndpoint {
    client: ApiClient,
}

impl FeedEndpoint {
    /// Wraps an authorized client.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetches one page of the main feed.
    pub async fn page(&self, page: u32, size: u32) -> Result<FeedBody, SourceError> {
        self.client.get_json("api/tweets", &paging(page, size)).await
    }

    /// Fetches one page of a user's tweets.
    pub async fn user_tweets(&self, name: &str, page: u32, size: u32) -> Result<Vec<Record>, SearchError> {
        let name = username(name)?;
        let body: FeedBody = self
            .client
            .get_json(&format!("api/tweets/user/{name}"), &paging(page, size))
            .await?;
        Ok(records_from_batch(body.into_batch())?)
    }
}

impl FeedSource for FeedEndpoint {
    async fn fetch_batch(&self, request: BatchRequest) -> Result<Vec<TweetPayload>, SourceError> {
        Ok(self.page(request.page, request.size).await?.into_batch())
    }
}

fn paging(page: u32, size: u32) -> [(&'static str, String); 2] {
    [("page", page.to_string()), ("size", size.to_string())]
}
