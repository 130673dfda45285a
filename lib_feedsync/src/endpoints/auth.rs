//! Authentication: `POST api/auth/login`, `api/auth/register`, `api/auth/logout`.
//!
//! The service issues an opaque bearer token. Nothing here refreshes or expires
//! it; a `Session` just carries it to whoever builds the authorized clients.

use reqwest::Method;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::endpoints::{server_message, username};
use crate::errors::{AuthError, SourceError, ValidationError};
use crate::model::Credential;
use crate::retrieve::{ApiClient, ApiResponse, status_error};

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    username: String,
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token for subsequent calls.
    pub credential: Credential,
    /// Username as confirmed by the server.
    pub username: String,
}

/// Anonymous client for the auth endpoints.
#[derive(Clone)]
pub struct AuthClient {
    client: ApiClient,
}

impl AuthClient {
    /// Wraps `client`, dropping any credential it carries.
    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.with_credential(None),
        }
    }

    /// Exchanges a username and password for a session.
    pub async fn login(&self, name: &str, password: &str) -> Result<Session, AuthError> {
        let name = username(name)?;
        let response = self
            .post::<LoginResponse>("api/auth/login", &Credentials { username: &name, password: non_empty(password)? })
            .await?;
        let login = decoded(response)?;
        log::info!("logged in as {}", login.username);
        Ok(Session {
            credential: Credential::new(login.token),
            username: login.username,
        })
    }

    /// Creates an account. Does not log in.
    pub async fn register(&self, name: &str, password: &str) -> Result<(), AuthError> {
        let name = username(name)?;
        let response = self
            .post::<IgnoredAny>("api/auth/register", &Credentials { username: &name, password: non_empty(password)? })
            .await?;
        accepted(response)?;
        log::info!("registered {name}");
        Ok(())
    }

    /// Ends the session on the server side.
    pub async fn logout(&self, credential: &Credential) -> Result<(), AuthError> {
        let response = self
            .client
            .with_credential(Some(credential.clone()))
            .call::<IgnoredAny, ()>(Method::POST, "api/auth/logout", &[], None)
            .await?;
        accepted(response)?;
        log::info!("logged out");
        Ok(())
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &Credentials<'_>,
    ) -> Result<ApiResponse<T>, SourceError> {
        self.client.call(Method::POST, path, &[], Some(body)).await
    }
}

fn non_empty(password: &str) -> Result<&str, ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Empty("password"));
    }
    Ok(password)
}

/// Success body, or the server's `{error}` message, or the status mapping.
fn decoded<T>(response: ApiResponse<T>) -> Result<T, AuthError> {
    if !response.success {
        return Err(failure(response));
    }
    Ok(response.into_result()?)
}

/// Like `decoded`, for calls whose success body is ignored.
fn accepted<T>(response: ApiResponse<T>) -> Result<(), AuthError> {
    if !response.success {
        return Err(failure(response));
    }
    Ok(())
}

fn failure<T>(response: ApiResponse<T>) -> AuthError {
    match server_message(response.error_body.as_deref()) {
        Some(message) => AuthError::Rejected(message),
        None => AuthError::Source(status_error(response.status, response.error_body.unwrap_or_default())),
    }
}
