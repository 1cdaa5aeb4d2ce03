//! Typed facade over the shared slot store.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use insights_core::config::StorageConfig;
use insights_core::result::AppResult;
use insights_core::traits::{KeyValueStore, StoreChange};
use insights_core::types::ContextId;

/// Holds the bearer token, the intended destination, and the debug flag.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
    token_key: String,
    destination_key: String,
    debug_key: String,
}

impl CredentialStore {
    /// Creates a store over `backend` using the slot names from `config`.
    pub fn new(backend: Arc<dyn KeyValueStore>, config: &StorageConfig) -> Self {
        Self {
            backend,
            token_key: config.token_key.clone(),
            destination_key: config.destination_key.clone(),
            debug_key: config.debug_key.clone(),
        }
    }

    /// Creates a store with the default slot names.
    pub fn with_backend(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::new(backend, &StorageConfig::default())
    }

    /// The underlying slot store.
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// The execution context this store writes as.
    pub fn context(&self) -> ContextId {
        self.backend.context()
    }

    /// Name of the token slot.
    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    /// Reads the persisted token. A blank slot counts as absent.
    pub fn read_token(&self) -> AppResult<Option<String>> {
        Ok(self
            .backend
            .get(&self.token_key)?
            .filter(|t| !t.trim().is_empty()))
    }

    /// Persists a token.
    pub fn write_token(&self, token: &str) -> AppResult<()> {
        self.backend.set(&self.token_key, token)
    }

    /// Clears the token slot.
    pub fn clear_token(&self) -> AppResult<()> {
        self.backend.remove(&self.token_key)
    }

    /// Reads the intended destination without consuming it.
    pub fn read_destination(&self) -> AppResult<Option<String>> {
        Ok(self
            .backend
            .get(&self.destination_key)?
            .filter(|d| !d.trim().is_empty()))
    }

    /// Records the intended destination.
    pub fn write_destination(&self, path: &str) -> AppResult<()> {
        self.backend.set(&self.destination_key, path)
    }

    /// Clears the intended destination.
    pub fn clear_destination(&self) -> AppResult<()> {
        self.backend.remove(&self.destination_key)
    }

    /// Reads and clears the intended destination.
    pub fn take_destination(&self) -> AppResult<Option<String>> {
        let destination = self.read_destination()?;
        self.backend.remove(&self.destination_key)?;
        Ok(destination)
    }

    /// Raw debug flag value.
    pub fn debug_flag(&self) -> AppResult<Option<String>> {
        self.backend.get(&self.debug_key)
    }

    /// Writes the raw debug flag value.
    pub fn set_debug_flag(&self, value: &str) -> AppResult<()> {
        self.backend.set(&self.debug_key, value)
    }

    /// Stream of token changes made outside this execution context.
    pub fn external_changes(&self) -> ExternalChanges {
        ExternalChanges {
            rx: self.backend.subscribe(),
            backend: Arc::clone(&self.backend),
            key: self.token_key.clone(),
            context: self.backend.context(),
        }
    }

    /// Invokes `callback` once per external token change until the store is
    /// dropped or the returned task is aborted.
    pub fn on_external_change<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: Fn(StoreChange) + Send + Sync + 'static,
    {
        let mut changes = self.external_changes();
        tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                callback(change);
            }
        })
    }
}

/// Receiver of token changes that did not originate in this context.
#[derive(Debug)]
pub struct ExternalChanges {
    rx: broadcast::Receiver<StoreChange>,
    backend: Arc<dyn KeyValueStore>,
    key: String,
    context: ContextId,
}

impl ExternalChanges {
    /// Waits for the next external token change. Returns `None` once the
    /// store has shut down.
    pub async fn recv(&mut self) -> Option<StoreChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) => {
                    if change.key == self.key
                        && change.origin != self.context
                        && change.old_value != change.new_value
                    {
                        debug!(origin = %change.origin, "External token change");
                        return Some(change);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Missed changes collapse into one: report the current value.
                    warn!(skipped, "Store change stream lagged");
                    let current = match self.backend.get(&self.key) {
                        Ok(value) => value,
                        Err(e) => {
                            warn!(error = %e, "Failed to re-read token slot after lag");
                            None
                        }
                    };
                    return Some(StoreChange {
                        key: self.key.clone(),
                        old_value: None,
                        new_value: current,
                        origin: ContextId::external(),
                    });
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
