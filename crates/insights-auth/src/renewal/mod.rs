//! Interactive session renewal.
//!
//! The prompt itself is a UI collaborator; [`RenewalDriver`] runs the
//! submit / authenticate / show-error loop until the user either renews or
//! dismisses.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::client::{Authenticator, Credentials};

/// Shown when a password is submitted but no subject is known.
pub const SUBJECT_UNAVAILABLE: &str = "Subject is not available for session renewal.";

/// Who the prompt is renewing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalRequest {
    /// Login name to authenticate as.
    pub subject_id: Option<String>,
    /// Name shown in the prompt.
    pub display_name: Option<String>,
}

/// What the user did with the prompt.
#[derive(Clone, PartialEq, Eq)]
pub enum PromptResponse {
    /// Re-entered password.
    Submit(String),
    /// Closed the prompt. Ends the session.
    Dismiss,
}

impl std::fmt::Debug for PromptResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submit(_) => write!(f, "Submit(<redacted>)"),
            Self::Dismiss => write!(f, "Dismiss"),
        }
    }
}

/// Result of a renewal flow.
#[derive(Clone, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// A fresh token was issued.
    Renewed(String),
    /// The user dismissed the prompt.
    Cancelled,
}

impl std::fmt::Debug for RenewalOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Renewed(_) => write!(f, "Renewed(<redacted>)"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// UI surface that collects the re-entered password.
#[async_trait]
pub trait RenewalPrompt: Send + Sync + std::fmt::Debug + 'static {
    /// Asks for the password. Called again after each failed attempt.
    async fn request_password(&self, request: &RenewalRequest) -> PromptResponse;

    /// Shows why the last attempt failed. The prompt stays open.
    fn show_error(&self, request: &RenewalRequest, message: &str);
}

/// Drives a [`RenewalPrompt`] against an [`Authenticator`].
#[derive(Debug, Clone)]
pub struct RenewalDriver {
    prompt: Arc<dyn RenewalPrompt>,
    authenticator: Arc<dyn Authenticator>,
}

impl RenewalDriver {
    /// Creates a driver.
    pub fn new(prompt: Arc<dyn RenewalPrompt>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            prompt,
            authenticator,
        }
    }

    /// Runs until the user renews or dismisses. Failed attempts are shown
    /// to the user and never retried without new input.
    pub async fn run(&self, request: &RenewalRequest) -> RenewalOutcome {
        loop {
            let password = match self.prompt.request_password(request).await {
                PromptResponse::Submit(password) => password,
                PromptResponse::Dismiss => {
                    info!("Renewal prompt dismissed");
                    return RenewalOutcome::Cancelled;
                }
            };

            let Some(subject) = request.subject_id.as_deref() else {
                self.prompt.show_error(request, SUBJECT_UNAVAILABLE);
                continue;
            };

            let credentials = Credentials::new(subject, password);
            match self.authenticator.authenticate(&credentials).await {
                Ok(response) => return RenewalOutcome::Renewed(response.token),
                Err(e) => {
                    warn!(category = ?e.category(), error = %e, "Renewal attempt failed");
                    self.prompt.show_error(request, &e.user_message());
                }
            }
        }
    }
}
