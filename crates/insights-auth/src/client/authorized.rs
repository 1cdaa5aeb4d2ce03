//! Bearer-authorized API requests.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use insights_core::config::ApiConfig;
use insights_core::result::AppResult;

use super::{build_http_client, error_text};
use crate::error::AuthError;
use crate::session::{ExpiryNotifier, ExpirySource};
use crate::store::CredentialStore;

/// Sends API requests with the stored bearer token attached.
///
/// A 401 raises the global session-expired notification so the session
/// manager can open the renewal prompt.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    http: reqwest::Client,
    config: ApiConfig,
    store: CredentialStore,
    expiry: ExpiryNotifier,
}

impl AuthorizedClient {
    /// Creates a client against `config.base_url`.
    pub fn new(config: &ApiConfig, store: CredentialStore, expiry: ExpiryNotifier) -> AppResult<Self> {
        Ok(Self {
            http: build_http_client(config)?,
            config: config.clone(),
            store,
            expiry,
        })
    }

    /// GET `path` and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, AuthError> {
        self.request(Method::GET, path, None).await
    }

    /// Sends a request and decodes the JSON body. `Ok(None)` for 204 or an
    /// empty body.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Option<T>, AuthError> {
        let url = self.config.url_for(path);
        let mut builder = self.http.request(method.clone(), &url);
        if let Some(token) = self.store.read_token()? {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        debug!(%method, %url, "API request");
        let response = builder.send().await.map_err(|e| {
            warn!(%url, error = %e, "API request failed");
            AuthError::from_transport(&e)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(%url, "API rejected the session token");
            self.expiry.notify(ExpirySource::Remote);
            return Err(AuthError::ExpiredToken);
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let text = response.text().await.map_err(|e| AuthError::from_transport(&e))?;
        if !status.is_success() {
            let message = error_text(&text).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            return Err(AuthError::RequestFailed {
                status: status.as_u16(),
                message,
            });
        }
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| AuthError::InvalidResponse {
                message: e.to_string(),
            })
    }
}
