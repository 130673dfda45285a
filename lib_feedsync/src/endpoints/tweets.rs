//! Tweet creation: `POST api/tweets {content}`.

use reqwest::Method;
use serde::Serialize;

use crate::endpoints::{bounded_text, server_message};
use crate::errors::ComposeError;
use crate::model::{MAX_CONTENT_CHARS, Record, TweetPayload};
use crate::retrieve::ApiClient;

#[derive(Serialize)]
struct NewTweet<'a> {
    content: &'a str,
}

/// Publishes tweets for the authenticated user.
#[derive(Clone)]
pub struct TweetComposer {
    client: ApiClient,
}

impl TweetComposer {
    /// Wraps an authorized client.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Validates and publishes `content`, returning the stored record.
    ///
    /// Content is trimmed first; blank or over-long content never leaves the
    /// process. The returned record is meant for `FeedEngine::insert_created`.
    pub async fn create(&self, content: &str) -> Result<Record, ComposeError> {
        let content = bounded_text("tweet content", content, MAX_CONTENT_CHARS)?;
        let response = self
            .client
            .call::<TweetPayload, _>(Method::POST, "api/tweets", &[], Some(&NewTweet { content: &content }))
            .await?;

        if response.status == 400 {
            let message = server_message(response.error_body.as_deref())
                .unwrap_or_else(|| "Failed to create tweet".to_string());
            return Err(ComposeError::Rejected(message));
        }

        let payload = response.into_result()?;
        let record = Record::try_from(payload)?;
        log::info!("published tweet {}", record.id);
        Ok(record)
    }
}
