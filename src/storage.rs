//! Durable key-value slots. The controller only ever touches one key (the player
//! identity), but it receives the store as a capability so tests can swap it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tracing::debug;

use crate::error::{AppError, Result};

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Process-local store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.slots.insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// JSON object file, loaded once on open and rewritten whole on every `set`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    slots: DashMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let slots = DashMap::new();

        if path.exists() {
            let content = fs::read_to_string(&path)?;
            if !content.trim().is_empty() {
                let stored: BTreeMap<String, String> = serde_json::from_str(&content)?;
                for (k, v) in stored {
                    slots.insert(k, v);
                }
            }
            debug!("Loaded {} slot(s) from {:?}", slots.len(), path);
        } else {
            debug!("Store file {:?} not found, starting empty", path);
        }

        Ok(Self { path, slots })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        let snapshot: BTreeMap<String, String> = self
            .slots
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let content = serde_json::to_string_pretty(&snapshot)?;

        // Write beside the target then rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::Storage(format!("could not replace {:?}: {e}", self.path))
        })?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.slots.insert(key.to_string(), value.to_string());
        self.persist()
    }
}
