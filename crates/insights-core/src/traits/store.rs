//! Key/value slot store trait for durable, context-shared client state.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::result::AppResult;
use crate::types::ContextId;

/// A single observed mutation of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreChange {
    /// The slot that changed.
    pub key: String,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change. `None` means the slot was removed.
    pub new_value: Option<String>,
    /// Execution context that made the change.
    pub origin: ContextId,
}

/// Trait for slot stores shared between execution contexts
/// (browser-tab-like handles, or separate processes on one machine).
///
/// All operations are synchronous. A write that leaves a slot unchanged
/// must not emit a [`StoreChange`].
pub trait KeyValueStore: Send + Sync + std::fmt::Debug + 'static {
    /// Get a slot value. Returns `None` if the slot is empty.
    fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a slot value.
    fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Clear a slot.
    fn remove(&self, key: &str) -> AppResult<()>;

    /// Subscribe to changes of any slot, including this context's own writes.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;

    /// The execution context this handle writes as.
    fn context(&self) -> ContextId;
}
