//! Session lifecycle and route policy configuration.

use serde::{Deserialize, Serialize};

/// Session lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Interval between token expiry checks, in seconds.
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    /// The login surface unauthenticated users are sent to.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// The default landing surface after login.
    #[serde(default = "default_landing_path")]
    pub landing_path: String,
    /// Path prefixes reachable without a session. Expiry on these is ignored.
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
    /// Path prefixes an authenticated user is redirected away from.
    #[serde(default = "default_public_paths")]
    pub public_redirect_pages: Vec<String>,
    /// Exact paths never used as a post-login destination.
    #[serde(default = "default_excluded_destinations")]
    pub excluded_destinations: Vec<String>,
    /// Role marker that maps a user to the supervisor role.
    #[serde(default = "default_supervisor_role")]
    pub supervisor_role: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: default_check_interval(),
            login_path: default_login_path(),
            landing_path: default_landing_path(),
            public_paths: default_public_paths(),
            public_redirect_pages: default_public_paths(),
            excluded_destinations: default_excluded_destinations(),
            supervisor_role: default_supervisor_role(),
        }
    }
}

fn default_check_interval() -> u64 {
    30
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_landing_path() -> String {
    "/".to_string()
}

fn default_public_paths() -> Vec<String> {
    vec!["/login".to_string()]
}

fn default_excluded_destinations() -> Vec<String> {
    ["/login", "/register", "/terms", "/"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_supervisor_role() -> String {
    "ROLE_SUPERVISOR".to_string()
}
