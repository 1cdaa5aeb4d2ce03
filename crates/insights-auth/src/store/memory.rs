//! In-memory slot store shared by every handle attached to it.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use insights_core::result::AppResult;
use insights_core::traits::{KeyValueStore, StoreChange};
use insights_core::types::ContextId;

const CHANGE_CAPACITY: usize = 64;

#[derive(Debug)]
struct Shared {
    /// Slot name → value
    slots: DashMap<String, String>,
    /// Change fan-out to every attached handle
    changes: broadcast::Sender<StoreChange>,
}

/// Process-wide slot store.
///
/// Cloning keeps the same execution context; [`MemoryStore::attach`] opens a
/// new one, the way a second browser tab shares local storage with the first.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
    context: ContextId,
}

impl MemoryStore {
    /// Creates an empty store with a fresh context.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                slots: DashMap::new(),
                changes,
            }),
            context: ContextId::new(),
        }
    }

    /// Opens another handle on the same slots under a new context.
    pub fn attach(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            context: ContextId::new(),
        }
    }

    fn emit(&self, key: &str, old_value: Option<String>, new_value: Option<String>) {
        // No receivers is not an error.
        let _ = self.shared.changes.send(StoreChange {
            key: key.to_string(),
            old_value,
            new_value,
            origin: self.context,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.shared.slots.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let old = self
            .shared
            .slots
            .insert(key.to_string(), value.to_string());
        if old.as_deref() != Some(value) {
            self.emit(key, old, Some(value.to_string()));
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        if let Some((_, old)) = self.shared.slots.remove(key) {
            self.emit(key, Some(old), None);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.shared.changes.subscribe()
    }

    fn context(&self) -> ContextId {
        self.context
    }
}
