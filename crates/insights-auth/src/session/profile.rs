//! User profile derived from token claims.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use insights_core::config::SessionConfig;

use crate::jwt::Claims;

/// Coarse role shown in the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerivedRole {
    /// Holds the supervisor marker.
    Supervisor,
    /// Everyone else.
    Operator,
}

impl fmt::Display for DerivedRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supervisor => write!(f, "Supervisor"),
            Self::Operator => write!(f, "Operator"),
        }
    }
}

/// Maps a role set onto a [`DerivedRole`].
///
/// Binary placeholder policy: the supervisor marker wins, anything else is
/// an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePolicy {
    supervisor_marker: String,
}

impl RolePolicy {
    /// Creates a policy keyed on `supervisor_marker`.
    pub fn new(supervisor_marker: impl Into<String>) -> Self {
        Self {
            supervisor_marker: supervisor_marker.into(),
        }
    }

    /// Builds the policy from session settings.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.supervisor_role.clone())
    }

    /// Derives the role for a role set.
    pub fn derive(&self, roles: &BTreeSet<String>) -> DerivedRole {
        if roles.contains(&self.supervisor_marker) {
            DerivedRole::Supervisor
        } else {
            DerivedRole::Operator
        }
    }
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::new("ROLE_SUPERVISOR")
    }
}

/// The signed-in operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identifier (same as the personal number).
    pub id: String,
    /// Personal number used as the login name.
    pub personal_number: String,
    /// Display name.
    pub display_name: String,
    /// Granted role markers.
    pub roles: BTreeSet<String>,
    /// Role derived from `roles`.
    pub role: DerivedRole,
    /// Whether the profile carries a verification timestamp.
    pub is_verified: bool,
    /// When the profile was verified.
    pub verified_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Builds a profile from decoded claims. Tokens issued by the
    /// authentication service count as verified at derivation time.
    pub fn from_claims(claims: &Claims, policy: &RolePolicy, now: DateTime<Utc>) -> Self {
        let verified_at = Some(now);
        Self {
            id: claims.subject_id.clone(),
            personal_number: claims.subject_id.clone(),
            display_name: claims.display_name.clone(),
            roles: claims.roles.clone(),
            role: policy.derive(&claims.roles),
            is_verified: verified_at.is_some(),
            verified_at,
        }
    }

    /// Whether the derived role is supervisor.
    pub fn is_supervisor(&self) -> bool {
        self.role == DerivedRole::Supervisor
    }

    /// Whether the profile describes the same person and grants as `other`,
    /// ignoring verification time.
    pub fn same_identity(&self, other: &UserProfile) -> bool {
        self.id == other.id
            && self.display_name == other.display_name
            && self.roles == other.roles
            && self.role == other.role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(roles: &[&str]) -> Claims {
        Claims {
            subject_id: "1001".to_string(),
            display_name: "Jana Novak".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn test_supervisor_marker_derives_supervisor() {
        let policy = RolePolicy::default();
        let profile = UserProfile::from_claims(
            &claims(&["ROLE_USER", "ROLE_SUPERVISOR"]),
            &policy,
            Utc::now(),
        );
        assert_eq!(profile.role, DerivedRole::Supervisor);
        assert!(profile.is_supervisor());
        assert_eq!(profile.id, profile.personal_number);
        assert!(profile.is_verified);
    }

    #[test]
    fn test_other_roles_derive_operator() {
        let policy = RolePolicy::default();
        let profile = UserProfile::from_claims(&claims(&["ROLE_USER"]), &policy, Utc::now());
        assert_eq!(profile.role, DerivedRole::Operator);
        assert_eq!(profile.role.to_string(), "Operator");
    }

    #[test]
    fn test_custom_marker() {
        let policy = RolePolicy::new("ROLE_LEAD");
        assert_eq!(
            policy.derive(&claims(&["ROLE_LEAD"]).roles),
            DerivedRole::Supervisor
        );
        assert_eq!(
            policy.derive(&claims(&["ROLE_SUPERVISOR"]).roles),
            DerivedRole::Operator
        );
    }
}
