//! Durable slot stores and the typed credential store.
//!
//! - [`MemoryStore`]: a process-wide shared map; every attached handle acts
//!   as its own execution context.
//! - [`FileStore`]: a JSON file shared between processes on one machine.
//! - [`CredentialStore`]: the token / destination / debug-flag facade the
//!   session manager talks to.

pub mod credential;
pub mod file;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use insights_core::config::{StorageBackend, StorageConfig};
use insights_core::result::AppResult;
use insights_core::traits::KeyValueStore;

pub use credential::{CredentialStore, ExternalChanges};
pub use file::FileStore;
pub use memory::MemoryStore;

/// An opened slot store backend.
#[derive(Debug)]
pub struct Backend {
    /// The store itself.
    pub store: Arc<dyn KeyValueStore>,
    /// Poller reporting changes made by other processes (file backend only).
    pub watcher: Option<JoinHandle<()>>,
}

/// Builds the configured slot store backend. The file backend's watcher is
/// spawned on the current tokio runtime.
pub fn open_backend(config: &StorageConfig) -> AppResult<Backend> {
    match config.backend {
        StorageBackend::Memory => Ok(Backend {
            store: Arc::new(MemoryStore::new()),
            watcher: None,
        }),
        StorageBackend::File => {
            let store = FileStore::open(&config.path)?;
            let watcher =
                store.spawn_watcher(Duration::from_millis(config.watch_interval_ms.max(10)));
            Ok(Backend {
                store: Arc::new(store),
                watcher: Some(watcher),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_file_backend_spawns_watcher() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StorageConfig {
            backend: StorageBackend::File,
            path: dir.path().join("slots.json").to_string_lossy().into_owned(),
            ..StorageConfig::default()
        };
        let backend = open_backend(&config).expect("open");
        backend.store.set("k", "v").expect("set");
        assert_eq!(backend.store.get("k").expect("get").as_deref(), Some("v"));
        let watcher = backend.watcher.expect("watcher");
        watcher.abort();
    }

    #[test]
    fn test_open_memory_backend_has_no_watcher() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            ..StorageConfig::default()
        };
        let backend = open_backend(&config).expect("open");
        assert!(backend.watcher.is_none());
    }
}
