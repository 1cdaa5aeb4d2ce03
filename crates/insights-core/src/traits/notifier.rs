//! User-facing notification surface.

use serde::{Deserialize, Serialize};

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    /// Informational confirmation.
    Info,
    /// A failed operation the user must act on.
    Destructive,
}

/// A short notification shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Headline.
    pub title: String,
    /// Detail line.
    pub description: String,
}

impl Notice {
    /// Create an informational notice.
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            description: description.into(),
        }
    }

    /// Create a destructive (error) notice.
    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Destructive,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Sink for user-facing notices.
pub trait Notifier: Send + Sync + std::fmt::Debug + 'static {
    /// Show a notice to the user.
    fn notify(&self, notice: Notice);
}
