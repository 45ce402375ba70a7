//! Answer persistence
//!
//! Answers are keyed by question index and stored as opaque rich-text
//! strings. `FsStore` keeps the whole map in one JSON file under the
//! data directory; `MemoryStore` backs tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::StoreError;

/// Keyed save/load of rich-text answers. Absent on first use.
pub trait PersistenceAdapter: Send {
    fn save(&mut self, index: usize, rich_text: &str) -> Result<(), StoreError>;
    fn load(&mut self, index: usize) -> Result<Option<String>, StoreError>;
}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<usize, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceAdapter for MemoryStore {
    fn save(&mut self, index: usize, rich_text: &str) -> Result<(), StoreError> {
        self.entries.insert(index, rich_text.to_string());
        Ok(())
    }

    fn load(&mut self, index: usize) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(&index).cloned())
    }
}

/// File-backed store: one JSON object mapping index to rich text,
/// written through on every save
#[derive(Debug)]
pub struct FsStore {
    path: PathBuf,
    entries: HashMap<usize, String>,
}

impl FsStore {
    /// Open the store file, creating an empty store when it is missing
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let entries = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "no existing answer store");
                HashMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        info!(?path, count = entries.len(), "answer store opened");
        Ok(Self {
            path: path.to_owned(),
            entries,
        })
    }

    fn flush(&self) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl PersistenceAdapter for FsStore {
    fn save(&mut self, index: usize, rich_text: &str) -> Result<(), StoreError> {
        self.entries.insert(index, rich_text.to_string());
        self.flush()
    }

    fn load(&mut self, index: usize) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(&index).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert!(store.load(0).unwrap().is_none());
        store.save(0, "answer text").unwrap();
        assert_eq!(store.load(0).unwrap().as_deref(), Some("answer text"));
    }

    #[test]
    fn test_fs_store_round_trip() {
        let path = std::env::temp_dir().join(format!("voiceform-store-{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);

        {
            let mut store = FsStore::open(&path).unwrap();
            assert!(store.load(3).unwrap().is_none());
            store.save(3, "persisted").unwrap();
        }

        let mut reopened = FsStore::open(&path).unwrap();
        assert_eq!(reopened.load(3).unwrap().as_deref(), Some("persisted"));

        let _ = std::fs::remove_file(&path);
    }
}
