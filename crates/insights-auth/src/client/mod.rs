//! HTTP collaborators: the authentication endpoint and bearer-authorized
//! API requests.

pub mod auth;
pub mod authorized;

use std::time::Duration;

use insights_core::config::ApiConfig;
use insights_core::error::AppError;
use insights_core::result::AppResult;

pub use auth::{Authenticator, Credentials, HttpAuthenticator, LoginResponse};
pub use authorized::AuthorizedClient;

/// Builds an HTTP client with the configured timeouts.
pub fn build_http_client(config: &ApiConfig) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .build()
        .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))
}

/// Pulls a human-readable reason out of an error response body.
///
/// JSON bodies are searched for `message`, `detail`, `hydra:description`
/// and `error`; anything else is used as plain text.
pub(crate) fn error_text(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => ["message", "detail", "hydra:description", "error"]
            .iter()
            .filter_map(|k| map.get(*k).and_then(|v| v.as_str()))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string),
        Ok(serde_json::Value::String(s)) => Some(s).filter(|s| !s.trim().is_empty()),
        _ => Some(trimmed.to_string()),
    }
}
