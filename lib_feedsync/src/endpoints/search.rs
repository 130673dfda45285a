//! User search: `GET api/search/user/{username}`.

use reqwest::Method;
use serde::Deserialize;

use crate::endpoints::{server_message, username};
use crate::errors::SearchError;
use crate::model::{Record, TweetPayload, records_from_batch};
use crate::retrieve::ApiClient;

/// The user block of a search result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FoundUser {
    /// Username.
    pub username: String,
    /// Role, e.g. `USER`.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Deserialize)]
struct SearchBody {
    user: Option<FoundUser>,
    #[serde(default)]
    tweets: Vec<TweetPayload>,
}

/// A user and their tweets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// The matched user.
    pub user: FoundUser,
    /// Their tweets, in server order.
    pub tweets: Vec<Record>,
}

/// Looks users up by name.
#[derive(Clone)]
pub struct UserSearch {
    client: ApiClient,
}

impl UserSearch {
    /// Wraps an authorized client.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Finds `name` and their tweets. A 404 or a body without a user is
    /// `SearchError::NotFound`.
    pub async fn search(&self, name: &str) -> Result<SearchResult, SearchError> {
        let name = username(name)?;
        let response = self
            .client
            .call::<SearchBody, ()>(Method::GET, &format!("api/search/user/{name}"), &[], None)
            .await?;

        if response.status == 404 {
            log::debug!(
                "user search for {name} found nothing: {}",
                server_message(response.error_body.as_deref()).unwrap_or_default()
            );
            return Err(SearchError::NotFound(name));
        }

        let body = response.into_result()?;
        let Some(user) = body.user else {
            return Err(SearchError::NotFound(name));
        };
        Ok(SearchResult {
            user,
            tweets: records_from_batch(body.tweets)?,
        })
    }
}
