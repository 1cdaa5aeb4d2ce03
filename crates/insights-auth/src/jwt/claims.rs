//! Decoded claim set carried inside a bearer token.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims decoded from a bearer token payload.
///
/// Derived from the token on every decode and never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier (the operator's personal number).
    pub subject_id: String,
    /// Display name.
    pub display_name: String,
    /// Granted role markers.
    pub roles: BTreeSet<String>,
    /// Absolute expiry instant.
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Whether the token has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self, now)
    }

    /// Returns the remaining TTL in seconds (0 if expired).
    pub fn remaining_ttl_seconds(&self, now: DateTime<Utc>) -> u64 {
        let remaining = (self.expires_at - now).num_seconds();
        if remaining > 0 { remaining as u64 } else { 0 }
    }

    /// Whether the role set contains a marker.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// True iff `now >= expires_at`.
pub fn is_expired(claims: &Claims, now: DateTime<Utc>) -> bool {
    now >= claims.expires_at
}
