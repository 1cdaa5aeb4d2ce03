//! Authentication endpoint client.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use insights_core::config::ApiConfig;
use insights_core::result::AppResult;

use super::{build_http_client, error_text};
use crate::error::AuthError;

/// Username/password pair sent to the authentication endpoint.
#[derive(Clone, Serialize)]
pub struct Credentials {
    /// Login name (the operator's personal number).
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful authentication response.
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    /// Freshly issued bearer token.
    pub token: String,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Exchanges credentials for a bearer token.
#[async_trait]
pub trait Authenticator: Send + Sync + fmt::Debug + 'static {
    /// Authenticates and returns the issued token.
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError>;
}

/// [`Authenticator`] that POSTs JSON to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    http: reqwest::Client,
    auth_url: String,
}

impl HttpAuthenticator {
    /// Creates an authenticator for `config.auth_url()`.
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        Ok(Self {
            http: build_http_client(config)?,
            auth_url: config.auth_url(),
        })
    }

    /// Use a custom HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// The endpoint this authenticator posts to.
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError> {
        debug!(url = %self.auth_url, username = %credentials.username, "Authenticating");

        let response = self
            .http
            .post(&self.auth_url)
            .json(credentials)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %self.auth_url, error = %e, "Authentication request failed");
                AuthError::from_transport(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::CredentialRejected {
                status: Some(status.as_u16()),
                message: error_text(&body),
            });
        }

        let body = response.text().await.map_err(|e| AuthError::from_transport(&e))?;
        serde_json::from_str::<LoginResponse>(&body).map_err(|e| AuthError::InvalidResponse {
            message: format!("login response is missing a token: {e}"),
        })
    }
}
