//! REST API and authentication endpoint configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the production API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API. A trailing slash is stripped on load.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the authentication endpoint, relative to `base_url`.
    #[serde(default = "default_auth_path")]
    pub auth_path: String,
    /// Total request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl ApiConfig {
    /// Strips trailing slashes from the base URL.
    pub fn normalize(&mut self) {
        let trimmed = self.base_url.trim_end_matches('/').len();
        self.base_url.truncate(trimmed);
    }

    /// Full URL of the authentication endpoint.
    pub fn auth_url(&self) -> String {
        self.url_for(&self.auth_path)
    }

    /// Joins a relative API path onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_path: default_auth_path(),
            request_timeout_seconds: default_request_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_auth_path() -> String {
    "/auth".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_connect_timeout() -> u64 {
    5
}
