//! Route guarding for protected views.

use tracing::debug;

use insights_core::types::PathPolicy;

use crate::session::{AuthPhase, AuthSessionManager, SessionSnapshot};

/// What a guarded view should do for the current session and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render a neutral placeholder while the session settles.
    Placeholder,
    /// Render the requested view.
    Render,
    /// Send the user to the login surface, remembering `remember` as the
    /// intended destination when set.
    RedirectToLogin {
        /// Path to return to after login.
        remember: Option<String>,
    },
    /// Send an authenticated user from a login-equivalent page to landing.
    RedirectToLanding,
}

/// Decides and enforces access to protected views.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    manager: AuthSessionManager,
}

impl RouteGuard {
    /// Creates a guard over `manager`'s session.
    pub fn new(manager: AuthSessionManager) -> Self {
        Self { manager }
    }

    /// Pure decision for `snapshot` at `path`.
    pub fn decide(paths: &PathPolicy, snapshot: &SessionSnapshot, path: &str) -> GuardDecision {
        if !snapshot.phase.is_settled() || snapshot.is_loading {
            return GuardDecision::Placeholder;
        }

        if snapshot.is_authenticated {
            return if paths.is_public_redirect_page(path) {
                GuardDecision::RedirectToLanding
            } else {
                GuardDecision::Render
            };
        }

        if paths.is_public(path) {
            GuardDecision::Render
        } else if snapshot.renewal.is_open || snapshot.phase == AuthPhase::RenewalPending {
            GuardDecision::Placeholder
        } else {
            GuardDecision::RedirectToLogin {
                remember: Some(path.to_string()),
            }
        }
    }

    /// Decides for the navigator's current path and carries out redirects.
    pub fn enforce(&self) -> GuardDecision {
        let path = self.manager.navigator().current_path();
        let decision = Self::decide(self.manager.paths(), &self.manager.snapshot(), &path);

        match &decision {
            GuardDecision::RedirectToLogin { remember } => {
                debug!(path = %path, "Unauthenticated on a protected route");
                if let Some(remember) = remember {
                    self.manager.remember_destination(remember);
                }
                self.manager
                    .navigator()
                    .replace(self.manager.paths().login_path());
            }
            GuardDecision::RedirectToLanding => {
                debug!(path = %path, "Authenticated on a login page");
                self.manager
                    .navigator()
                    .replace(self.manager.paths().landing_path());
            }
            GuardDecision::Placeholder | GuardDecision::Render => {}
        }
        decision
    }
}
