//! Terminal implementations of the navigation, notification, and renewal
//! prompt surfaces.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use insights_auth::{PromptResponse, RenewalPrompt, RenewalRequest};
use insights_core::traits::{Navigator, Notice, NoticeLevel, Notifier};

use crate::output;

/// In-process route state. Navigation only moves the current path.
#[derive(Debug)]
pub struct RouteState {
    current: Mutex<String>,
}

impl RouteState {
    /// Starts at `path`.
    pub fn at(path: &str) -> Self {
        Self {
            current: Mutex::new(path.to_string()),
        }
    }

    fn set(&self, path: &str) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = path.to_string();
    }
}

impl Navigator for RouteState {
    fn current_path(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, path: &str) {
        debug!(path, "Navigate");
        self.set(path);
        output::print_kv("Navigated to", path);
    }

    fn replace(&self, path: &str) {
        debug!(path, "Navigate (replace)");
        self.set(path);
        output::print_kv("Redirected to", path);
    }
}

/// Prints notices to the terminal.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        let line = format!("{}: {}", notice.title, notice.description);
        match notice.level {
            NoticeLevel::Info => output::print_success(&line),
            NoticeLevel::Destructive => output::print_error(&line),
        }
    }
}

/// Asks for the password on the terminal. An empty answer dismisses.
///
/// The read runs on a blocking thread that cannot be interrupted. When the
/// renewal is cancelled mid-read, the thread stays parked on stdin and the
/// next request picks up its answer instead of starting a second reader.
#[derive(Debug, Default)]
pub struct TerminalPrompt {
    pending: tokio::sync::Mutex<Option<JoinHandle<std::io::Result<String>>>>,
}

fn read_password() -> std::io::Result<String> {
    dialoguer::Password::new()
        .with_prompt("Password")
        .allow_empty_password(true)
        .interact()
        .map_err(std::io::Error::other)
}

#[async_trait]
impl RenewalPrompt for TerminalPrompt {
    async fn request_password(&self, request: &RenewalRequest) -> PromptResponse {
        let who = request
            .display_name
            .clone()
            .unwrap_or_else(|| "unknown user".to_string());
        output::print_warning(&format!(
            "Session expired for {who}. Enter your password to continue, or leave it empty to log out."
        ));

        let mut pending = self.pending.lock().await;
        let read = pending.get_or_insert_with(|| tokio::task::spawn_blocking(read_password));
        let answer = read.await;
        *pending = None;

        match answer {
            Ok(Ok(password)) if !password.is_empty() => PromptResponse::Submit(password),
            Ok(Ok(_)) => PromptResponse::Dismiss,
            Ok(Err(e)) => {
                warn!(error = %e, "Password prompt failed");
                PromptResponse::Dismiss
            }
            Err(e) => {
                warn!(error = %e, "Password prompt task failed");
                PromptResponse::Dismiss
            }
        }
    }

    fn show_error(&self, _request: &RenewalRequest, message: &str) {
        output::print_error(message);
    }
}
