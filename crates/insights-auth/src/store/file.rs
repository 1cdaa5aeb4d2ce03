//! JSON-file slot store shared between processes on one machine.
//!
//! The file holds a single JSON object of slot name → string value. Writes
//! go to a sibling temp file that is then renamed over the original, so a
//! reader never observes a half-written file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use insights_core::error::AppError;
use insights_core::result::AppResult;
use insights_core::traits::{KeyValueStore, StoreChange};
use insights_core::types::ContextId;

const CHANGE_CAPACITY: usize = 64;

type Slots = BTreeMap<String, String>;

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    /// Slots as last seen on disk by this process
    known: Mutex<Slots>,
    changes: broadcast::Sender<StoreChange>,
}

/// Slot store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    inner: Arc<Inner>,
    context: ContextId,
}

impl FileStore {
    /// Opens (or lazily creates) the slot file at `path`.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::storage(format!(
                    "Failed to create store directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let known = read_slots(&path)?;
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                path,
                known: Mutex::new(known),
                changes,
            }),
            context: ContextId::new(),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Spawns a task that polls the file and reports changes made by other
    /// processes. The task ends once every handle on this store is dropped;
    /// abort the returned handle to stop it earlier.
    pub fn spawn_watcher(&self, interval: Duration) -> JoinHandle<()> {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let context = self.context;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    debug!("Slot store dropped, watcher stopped");
                    break;
                };
                let store = FileStore { inner, context };
                let result = {
                    let mut known = store.lock();
                    store.sync(&mut known)
                };
                if let Err(e) = result {
                    warn!(path = %store.inner.path.display(), error = %e, "Slot file poll failed");
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.inner
            .known
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Reloads the file and reports every slot that differs from what this
    /// process last saw as an external change.
    fn sync(&self, known: &mut Slots) -> AppResult<()> {
        let current = read_slots(&self.inner.path)?;
        if current == *known {
            return Ok(());
        }

        let keys: BTreeSet<&String> = known.keys().chain(current.keys()).collect();
        for key in keys {
            let old_value = known.get(key).cloned();
            let new_value = current.get(key).cloned();
            if old_value != new_value {
                debug!(key = %key, "Slot changed outside this process");
                let _ = self.inner.changes.send(StoreChange {
                    key: key.clone(),
                    old_value,
                    new_value,
                    origin: ContextId::external(),
                });
            }
        }
        *known = current;
        Ok(())
    }

    fn write_locked(
        &self,
        known: &mut Slots,
        key: &str,
        value: Option<&str>,
    ) -> AppResult<()> {
        self.sync(known)?;

        let old_value = known.get(key).cloned();
        if old_value.as_deref() == value {
            return Ok(());
        }

        let mut next = known.clone();
        match value {
            Some(v) => next.insert(key.to_string(), v.to_string()),
            None => next.remove(key),
        };
        write_slots(&self.inner.path, &next)?;
        *known = next;

        let _ = self.inner.changes.send(StoreChange {
            key: key.to_string(),
            old_value,
            new_value: value.map(str::to_string),
            origin: self.context,
        });
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut known = self.lock();
        self.sync(&mut known)?;
        Ok(known.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut known = self.lock();
        self.write_locked(&mut known, key, Some(value))
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let mut known = self.lock();
        self.write_locked(&mut known, key, None)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.changes.subscribe()
    }

    fn context(&self) -> ContextId {
        self.context
    }
}

fn read_slots(path: &Path) -> AppResult<Slots> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Slots::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            AppError::storage(format!("Slot file {} is corrupt: {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Slots::new()),
        Err(e) => Err(AppError::storage(format!(
            "Failed to read slot file {}: {e}",
            path.display()
        ))),
    }
}

fn write_slots(path: &Path, slots: &Slots) -> AppResult<()> {
    let body = serde_json::to_vec_pretty(slots)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, body).map_err(|e| {
        AppError::storage(format!("Failed to write slot file {}: {e}", tmp.display()))
    })?;
    std::fs::rename(&tmp, path).map_err(|e| {
        AppError::storage(format!("Failed to replace slot file {}: {e}", path.display()))
    })
}
