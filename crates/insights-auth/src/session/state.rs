//! Session phases, observer snapshots, and the manager's mutable state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::profile::UserProfile;
use crate::jwt::Claims;

/// Lifecycle phase of the auth session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    /// Not started yet.
    Uninitialized,
    /// Reading and validating the persisted token.
    Resuming,
    /// A valid token and profile are installed.
    Authenticated,
    /// No session.
    Unauthenticated,
    /// The token expired and the renewal prompt is open.
    RenewalPending,
    /// Tearing the session down.
    LoggingOut,
}

impl AuthPhase {
    /// Whether the phase is one a route guard may act on.
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            Self::Authenticated | Self::Unauthenticated | Self::RenewalPending
        )
    }
}

impl fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Resuming => "resuming",
            Self::Authenticated => "authenticated",
            Self::Unauthenticated => "unauthenticated",
            Self::RenewalPending => "renewal_pending",
            Self::LoggingOut => "logging_out",
        };
        write!(f, "{s}")
    }
}

/// Whether the renewal prompt is open and whom it is for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenewalPromptState {
    /// At most one prompt is open per manager.
    pub is_open: bool,
    /// Display name shown in the prompt, when resolvable.
    pub subject_hint: Option<String>,
}

/// Immutable view of the session handed to observers.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Current phase.
    pub phase: AuthPhase,
    /// Signed-in user, if any.
    pub user: Option<UserProfile>,
    /// Raw bearer token. Never serialized.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// True iff a user and a token are present and the token's claims were
    /// valid at last check.
    pub is_authenticated: bool,
    /// True only during startup resume, explicit login, or explicit logout.
    pub is_loading: bool,
    /// Expiry of the installed token.
    pub expires_at: Option<DateTime<Utc>>,
    /// Renewal prompt state.
    pub renewal: RenewalPromptState,
}

impl fmt::Debug for SessionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSnapshot")
            .field("phase", &self.phase)
            .field("user", &self.user)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("is_authenticated", &self.is_authenticated)
            .field("is_loading", &self.is_loading)
            .field("expires_at", &self.expires_at)
            .field("renewal", &self.renewal)
            .finish()
    }
}

/// Mutable state owned by the session manager.
#[derive(Debug)]
pub(crate) struct ManagerState {
    pub phase: AuthPhase,
    pub user: Option<UserProfile>,
    pub token: Option<String>,
    pub claims: Option<Claims>,
    pub is_loading: bool,
    pub renewal: RenewalPromptState,
    /// Bumped by logout and external clears; in-flight attempts started
    /// under an older generation may not commit.
    pub generation: u64,
}

impl ManagerState {
    pub fn new() -> Self {
        Self {
            phase: AuthPhase::Uninitialized,
            user: None,
            token: None,
            claims: None,
            is_loading: false,
            renewal: RenewalPromptState::default(),
            generation: 0,
        }
    }

    /// Installs a validated token and closes any renewal prompt.
    pub fn install(&mut self, token: String, claims: Claims, user: UserProfile) {
        self.phase = AuthPhase::Authenticated;
        self.user = Some(user);
        self.token = Some(token);
        self.claims = Some(claims);
        self.renewal = RenewalPromptState::default();
    }

    /// Resets to the empty session. Leaves `is_loading` to the caller.
    pub fn clear(&mut self) {
        self.phase = AuthPhase::Unauthenticated;
        self.user = None;
        self.token = None;
        self.claims = None;
        self.renewal = RenewalPromptState::default();
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == AuthPhase::Authenticated && self.user.is_some() && self.token.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            user: self.user.clone(),
            token: self.token.clone(),
            is_authenticated: self.is_authenticated(),
            is_loading: self.is_loading,
            expires_at: self.claims.as_ref().map(|c| c.expires_at),
            renewal: self.renewal.clone(),
        }
    }
}
