//! Persisted client state configuration.

use serde::{Deserialize, Serialize};

/// Which backend holds the shared client slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// A JSON file shared by every process on this machine.
    #[default]
    File,
    /// A process-local map. State is lost on exit.
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::File => write!(f, "file"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Client slot store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Path to the slot file when `backend = "file"`.
    #[serde(default = "default_path")]
    pub path: String,
    /// Slot holding the raw bearer token.
    #[serde(default = "default_token_key")]
    pub token_key: String,
    /// Slot holding the intended destination path.
    #[serde(default = "default_destination_key")]
    pub destination_key: String,
    /// Slot holding the debug-mode flag.
    #[serde(default = "default_debug_key")]
    pub debug_key: String,
    /// How often the file backend looks for changes made by other processes.
    #[serde(default = "default_watch_interval")]
    pub watch_interval_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_path(),
            token_key: default_token_key(),
            destination_key: default_destination_key(),
            debug_key: default_debug_key(),
            watch_interval_ms: default_watch_interval(),
        }
    }
}

fn default_path() -> String {
    "data/session.json".to_string()
}

fn default_token_key() -> String {
    "production_insights_auth_token".to_string()
}

fn default_destination_key() -> String {
    "intended_destination".to_string()
}

fn default_debug_key() -> String {
    "debugMode".to_string()
}

fn default_watch_interval() -> u64 {
    500
}
