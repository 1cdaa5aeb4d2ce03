//! Authentication error taxonomy.

use insights_core::error::{AppError, ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::jwt::DecodeError;

/// Message shown when the server rejects credentials without a reason.
pub const GENERIC_LOGIN_FAILED: &str = "Login failed. Please check your credentials and try again.";

/// Message shown when the authentication service cannot be reached.
pub const NETWORK_UNREACHABLE_HINT: &str = "Could not reach the authentication server. \
     Check your network connection and the API server configuration.";

/// Coarse category of an [`AuthError`], used to pick the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorCategory {
    /// A token was malformed.
    Decode,
    /// The server refused the credentials.
    CredentialRejected,
    /// The server could not be reached.
    NetworkUnreachable,
    /// The token is past its expiry.
    ExpiredToken,
    /// The server answered with something outside its contract.
    ServerContract,
    /// A logout or store clear overtook the operation.
    Superseded,
    /// Persisted state could not be read or written.
    Storage,
}

/// Errors raised by authentication and session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token could not be decoded.
    #[error("token could not be decoded: {0}")]
    Decode(#[from] DecodeError),

    /// The authentication endpoint returned a non-success status.
    #[error("credentials rejected: {}", .message.as_deref().unwrap_or("no reason given"))]
    CredentialRejected {
        /// HTTP status, when one was received.
        status: Option<u16>,
        /// Server-provided reason, when available.
        message: Option<String>,
    },

    /// A transport-level failure (refused connection, DNS, timeout).
    #[error("authentication service unreachable: {message}")]
    NetworkUnreachable {
        /// Transport error description.
        message: String,
    },

    /// The session token has expired.
    #[error("session token has expired")]
    ExpiredToken,

    /// The server answered with an unreadable body.
    #[error("unexpected response from server: {message}")]
    InvalidResponse {
        /// What was wrong with the response.
        message: String,
    },

    /// An authorized API request failed with a non-success status.
    #[error("request failed with status {status}: {message}")]
    RequestFailed {
        /// HTTP status.
        status: u16,
        /// Response body text.
        message: String,
    },

    /// A logout or store clear happened while this operation was in flight.
    #[error("superseded by a newer session change")]
    Superseded,

    /// Persisted state could not be read or written.
    #[error(transparent)]
    Storage(#[from] AppError),
}

impl AuthError {
    /// Map a transport error from the HTTP client.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::InvalidResponse {
                message: err.to_string(),
            };
        }
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else {
            err.to_string()
        };
        Self::NetworkUnreachable { message }
    }

    /// The category this error belongs to.
    pub fn category(&self) -> AuthErrorCategory {
        match self {
            Self::Decode(_) => AuthErrorCategory::Decode,
            Self::CredentialRejected { .. } => AuthErrorCategory::CredentialRejected,
            Self::NetworkUnreachable { .. } => AuthErrorCategory::NetworkUnreachable,
            Self::ExpiredToken => AuthErrorCategory::ExpiredToken,
            Self::InvalidResponse { .. } | Self::RequestFailed { .. } => {
                AuthErrorCategory::ServerContract
            }
            Self::Superseded => AuthErrorCategory::Superseded,
            Self::Storage(_) => AuthErrorCategory::Storage,
        }
    }

    /// The single categorized message to show the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::CredentialRejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            Self::CredentialRejected { .. } => GENERIC_LOGIN_FAILED.to_string(),
            Self::NetworkUnreachable { .. } => NETWORK_UNREACHABLE_HINT.to_string(),
            Self::Decode(_) | Self::InvalidResponse { .. } => {
                "The server returned an unreadable session token.".to_string()
            }
            Self::ExpiredToken => "Your session has expired. Please sign in again.".to_string(),
            Self::RequestFailed { status, message } => {
                format!("Request failed ({status}): {message}")
            }
            Self::Superseded => "The session changed while signing in.".to_string(),
            Self::Storage(e) => e.message.clone(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let kind = match err.category() {
            AuthErrorCategory::Decode => ErrorKind::Token,
            AuthErrorCategory::CredentialRejected | AuthErrorCategory::ExpiredToken => {
                ErrorKind::Authentication
            }
            AuthErrorCategory::NetworkUnreachable => ErrorKind::Network,
            AuthErrorCategory::ServerContract => ErrorKind::Internal,
            AuthErrorCategory::Superseded => ErrorKind::Session,
            AuthErrorCategory::Storage => ErrorKind::Storage,
        };
        let message = err.user_message();
        AppError::with_source(kind, message, err)
    }
}
