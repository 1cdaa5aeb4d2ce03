//! Classification of application paths into public, login-equivalent,
//! and valid post-login destinations.

use crate::config::SessionConfig;

/// Route policy derived from [`SessionConfig`].
#[derive(Debug, Clone)]
pub struct PathPolicy {
    login_path: String,
    landing_path: String,
    public_paths: Vec<String>,
    public_redirect_pages: Vec<String>,
    excluded_destinations: Vec<String>,
}

impl PathPolicy {
    /// Build the policy from session configuration.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            login_path: config.login_path.clone(),
            landing_path: config.landing_path.clone(),
            public_paths: config.public_paths.clone(),
            public_redirect_pages: config.public_redirect_pages.clone(),
            excluded_destinations: config.excluded_destinations.clone(),
        }
    }

    /// The login surface.
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// The default landing surface.
    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    /// Whether a path can be viewed without a session.
    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Whether a path is a login-equivalent surface.
    pub fn is_public_redirect_page(&self, path: &str) -> bool {
        self.public_redirect_pages
            .iter()
            .any(|p| path.starts_with(p.as_str()))
    }

    /// Whether a stored destination may be used as a post-login target.
    ///
    /// The path must be a same-origin relative path (`/x`, not `//host/x`)
    /// and not one of the excluded default surfaces.
    pub fn is_valid_destination(&self, path: &str) -> bool {
        let path = path.trim();
        !path.is_empty()
            && path.starts_with('/')
            && !path.starts_with("//")
            && !self.excluded_destinations.iter().any(|p| p == path)
            && !self.is_public(path)
    }

    /// The trimmed stored destination, if it is a valid post-login target.
    pub fn valid_destination(&self, intended: Option<&str>) -> Option<String> {
        intended
            .map(str::trim)
            .filter(|path| self.is_valid_destination(path))
            .map(str::to_string)
    }

    /// Resolve where to navigate after a successful login.
    pub fn resolve_destination(&self, intended: Option<&str>) -> String {
        self.valid_destination(intended)
            .unwrap_or_else(|| self.landing_path.clone())
    }
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_prefix_match() {
        let policy = PathPolicy::default();
        assert!(policy.is_public("/login"));
        assert!(policy.is_public("/login?next=/shifts"));
        assert!(!policy.is_public("/products"));
        assert!(!policy.is_public("/"));
    }

    #[test]
    fn test_destination_rules() {
        let policy = PathPolicy::default();
        assert!(policy.is_valid_destination("/problems"));
        assert!(policy.is_valid_destination("/shifts/42"));
        assert!(!policy.is_valid_destination("/"));
        assert!(!policy.is_valid_destination("/login"));
        assert!(!policy.is_valid_destination("/register"));
        assert!(!policy.is_valid_destination("//evil.example.com/x"));
        assert!(!policy.is_valid_destination("https://evil.example.com"));
        assert!(!policy.is_valid_destination("   "));
    }

    #[test]
    fn test_resolve_destination_falls_back_to_landing() {
        let policy = PathPolicy::default();
        assert_eq!(policy.resolve_destination(Some("/problems")), "/problems");
        assert_eq!(policy.resolve_destination(Some("/terms")), "/");
        assert_eq!(policy.resolve_destination(None), "/");
        assert_eq!(policy.resolve_destination(Some(" /problems ")), "/problems");
    }

    #[test]
    fn test_valid_destination_without_fallback() {
        let policy = PathPolicy::default();
        assert_eq!(
            policy.valid_destination(Some("\t/shifts/42")).as_deref(),
            Some("/shifts/42")
        );
        assert_eq!(policy.valid_destination(Some("/login")), None);
        assert_eq!(policy.valid_destination(None), None);
    }
}
