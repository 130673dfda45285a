//! # HTTP Retrieval Utilities
//!
//! An asynchronous API client wrapper around `reqwest` with an optional retry
//! middleware, bearer authentication and standardized JSON response handling.
//!
//! The client never retries by default: synchronization retries are driven by
//! the engine's triggers. `ClientOptions::max_retries` turns on exponential
//! backoff for transient failures when a caller wants it.

use std::time::Duration;

use anyhow::Context;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use reqwest::{Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Serialize, de::DeserializeOwned};

use crate::errors::SourceError;
use crate::model::Credential;

/// Transport knobs for an `ApiClient`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Retries for transient failures (connect errors, 5xx, 429). Zero disables
    /// the retry middleware.
    pub max_retries: u32,
    /// Whole-request timeout. `None` keeps the transport default (no timeout).
    pub timeout: Option<Duration>,
}

/// A standardized container for API responses.
///
/// Wraps the deserialized data together with the transaction metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The deserialized response body. `None` for failures and empty bodies.
    pub data: Option<T>,
    /// The raw body returned by the server when the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Whether the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

impl<T> ApiResponse<T> {
    /// Maps the response onto the error taxonomy: 401/403 become
    /// `Unauthorized`, other failures `Http`, and a success without a body
    /// `Decode`.
    pub fn into_result(self) -> Result<T, SourceError> {
        if !self.success {
            return Err(status_error(self.status, self.error_body.unwrap_or_default()));
        }
        self.data
            .ok_or_else(|| SourceError::Decode(format!("HTTP {} with an empty body", self.status)))
    }
}

/// Classifies a non-2xx status.
pub fn status_error(status: u16, body: String) -> SourceError {
    match status {
        401 | 403 => SourceError::Unauthorized { status },
        _ => SourceError::Http { status, body },
    }
}

/// A flexible asynchronous HTTP client.
///
/// Handles the base URL, the bearer credential and, optionally, retries.
#[derive(Clone)]
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// The base URL to which all relative paths are joined.
    base_url: Url,
    /// Bearer credential attached to every request.
    credential: Option<Credential>,
}

impl ApiClient {
    /// Creates a client for `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - Absolute base URL, e.g. `http://localhost:8080/`. A missing
    ///   trailing slash is added so relative paths join under it.
    /// * `credential` - Bearer token for the `Authorization` header, if any.
    /// * `options` - Retry and timeout settings.
    ///
    /// # Errors
    /// Fails if the URL is not absolute or the TLS backend cannot initialize.
    pub fn new(base_url: &str, credential: Option<Credential>, options: ClientOptions) -> anyhow::Result<Self> {
        let mut url = Url::parse(base_url).with_context(|| format!("invalid base URL {base_url:?}"))?;
        if url.cannot_be_a_base() {
            anyhow::bail!("base URL {base_url:?} cannot carry relative paths");
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let mut http = reqwest::Client::builder();
        if let Some(timeout) = options.timeout {
            http = http.timeout(timeout);
        }
        let http = http.build().context("failed to build HTTP client")?;

        let mut builder = ClientBuilder::new(http);
        if options.max_retries > 0 {
            let retry_policy = ExponentialBackoff::builder().build_with_max_retries(options.max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(Self {
            inner: builder.build(),
            base_url: url,
            credential,
        })
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Same transport and base URL, different credential.
    pub fn with_credential(&self, credential: Option<Credential>) -> Self {
        Self {
            inner: self.inner.clone(),
            base_url: self.base_url.clone(),
            credential,
        }
    }

    /// Performs an HTTP request and decodes a JSON response.
    ///
    /// # Arguments
    /// * `method` - The HTTP verb.
    /// * `path` - Path relative to the base URL (no leading slash).
    /// * `query` - Query pairs appended to the URL.
    /// * `body` - Optional serializable value sent as the JSON body.
    ///
    /// A 2xx response with an empty body yields `data: None`. Non-2xx responses
    /// carry the raw body in `error_body`.
    ///
    /// # Errors
    /// Fails on URL joining, network errors, or an undecodable 2xx body.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> anyhow::Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        // 1. Construct the full absolute URL
        let mut full_url = self.base_url.join(path)?;
        if !query.is_empty() {
            full_url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        let mut req = self.inner.request(method, full_url);

        // 2. Inject Bearer Authentication if a credential is present
        if let Some(credential) = &self.credential {
            req = req.header(AUTHORIZATION, format!("Bearer {}", credential.token()));
        }

        // 3. Serialize and attach the JSON body if present
        if let Some(b) = body {
            let json_body = serde_json::to_string(b)?;
            req = req.header(CONTENT_TYPE, "application/json").body(json_body);
        }

        // 4. Execute the request and capture response metadata
        let response: reqwest::Response = req.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        // 5. Handle the result based on success status
        if status.is_success() {
            let bytes = response.bytes().await?;
            let data = if bytes.iter().all(u8::is_ascii_whitespace) {
                None
            } else {
                Some(serde_json::from_slice::<T>(&bytes).context("failed to decode response body")?)
            };
            Ok(ApiResponse {
                data,
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers,
            })
        } else {
            let error_text = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
                headers,
            })
        }
    }

    /// `request` with failures mapped onto `SourceError`.
    ///
    /// Decode failures become `Decode`; everything else that prevented a
    /// response becomes `Transport`. The status of a completed response is left
    /// for the caller (see `ApiResponse::into_result`).
    pub async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, SourceError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(method, path, query, body).await.map_err(classify)
    }

    /// GET and map onto the error taxonomy in one step.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, SourceError> {
        self.call::<T, ()>(Method::GET, path, query, None).await?.into_result()
    }
}

fn classify(err: anyhow::Error) -> SourceError {
    if err.downcast_ref::<serde_json::Error>().is_some() {
        SourceError::Decode(format!("{err:#}"))
    } else {
        SourceError::Transport(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_a_trailing_slash() {
        let client = ApiClient::new("http://localhost:8080/app", None, ClientOptions::default()).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/app/");
        assert_eq!(
            client.base_url().join("api/tweets").unwrap().as_str(),
            "http://localhost:8080/app/api/tweets"
        );
    }

    #[test]
    fn relative_base_url_is_rejected() {
        assert!(ApiClient::new("localhost:8080", None, ClientOptions::default()).is_err());
        assert!(ApiClient::new("/api", None, ClientOptions::default()).is_err());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(status_error(401, String::new()), SourceError::Unauthorized { status: 401 });
        assert_eq!(status_error(403, "nope".into()), SourceError::Unauthorized { status: 403 });
        assert_eq!(
            status_error(503, "down".into()),
            SourceError::Http { status: 503, body: "down".into() }
        );
    }

    #[test]
    fn successful_empty_body_is_a_decode_error() {
        let response: ApiResponse<u32> = ApiResponse {
            data: None,
            error_body: None,
            status: 200,
            success: true,
            headers: HeaderMap::new(),
        };
        assert!(matches!(response.into_result(), Err(SourceError::Decode(_))));
    }

    #[test]
    fn decode_errors_are_classified_apart_from_transport() {
        let decode = serde_json::from_str::<u32>("x").unwrap_err();
        let err = anyhow::Error::new(decode).context("failed to decode response body");
        assert!(matches!(classify(err), SourceError::Decode(_)));
        assert!(matches!(classify(anyhow::anyhow!("connection refused")), SourceError::Transport(_)));
    }
}
