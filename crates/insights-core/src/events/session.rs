//! Session-related domain events.

use serde::{Deserialize, Serialize};

/// Events related to the client session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// A persisted token was accepted at startup or after an external change.
    Resumed {
        /// Display name from the token.
        display_name: String,
    },
    /// A persisted token was rejected and removed from the store.
    Discarded {
        /// Why the token was rejected.
        reason: String,
    },
    /// A user logged in with credentials.
    LoggedIn {
        /// Display name from the token.
        display_name: String,
    },
    /// The session was torn down.
    LoggedOut {
        /// Why the session ended.
        reason: String,
    },
    /// The live token passed its expiry.
    Expired,
    /// The renewal prompt was opened.
    RenewalOpened,
    /// A renewal replaced the expired token.
    Renewed {
        /// Display name from the new token.
        display_name: String,
    },
    /// The user dismissed the renewal prompt.
    RenewalCancelled,
    /// Another context changed the persisted token.
    ExternalChange,
}
