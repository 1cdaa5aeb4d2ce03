//! Persisted debug-mode flag.

use insights_core::result::AppResult;

use crate::store::CredentialStore;

/// Debug mode stored as a `"true"` / `"false"` string in the shared store.
#[derive(Debug, Clone)]
pub struct DebugMode {
    store: CredentialStore,
}

impl DebugMode {
    /// Creates a handle over the store's debug slot.
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    /// Whether debug mode is on. Anything but `"true"` is off.
    pub fn is_enabled(&self) -> AppResult<bool> {
        Ok(self.store.debug_flag()?.as_deref() == Some("true"))
    }

    /// Turns debug mode on or off.
    pub fn set(&self, enabled: bool) -> AppResult<()> {
        self.store
            .set_debug_flag(if enabled { "true" } else { "false" })
    }

    /// Flips debug mode and returns the new value.
    pub fn toggle(&self) -> AppResult<bool> {
        let enabled = !self.is_enabled()?;
        self.set(enabled)?;
        Ok(enabled)
    }
}
