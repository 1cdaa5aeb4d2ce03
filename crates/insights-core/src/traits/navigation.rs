//! Route surface consumed by the session manager and route guard.

/// Read/write access to the application's current location.
pub trait Navigator: Send + Sync + std::fmt::Debug + 'static {
    /// The path currently displayed.
    fn current_path(&self) -> String;

    /// Navigate to a path, adding a history entry.
    fn push(&self, path: &str);

    /// Navigate to a path, replacing the current history entry.
    fn replace(&self, path: &str);
}
