//! Single-file JSON memory store

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use super::MemoryStore;
use crate::session::{SessionState, SessionStore};
use crate::{Error, Result};

/// Keeps every session in one JSON document on disk
///
/// Writes land in a temporary sibling file that is renamed over the target,
/// so readers see either the old or the new document. Within this process
/// `save_user` and `remove_user` run their read-modify-write under a write
/// lock; separate processes sharing the file still race (last write wins).
pub struct JsonFileStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl JsonFileStore {
    /// Create a store backed by `path`; the file is created on first save
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    /// Location of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_store(&self) -> Result<SessionStore> {
        if !self.path.exists() {
            return Ok(SessionStore::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(SessionStore::new());
        }

        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&content)?;
        let mut store = SessionStore::new();
        for (user_id, value) in raw {
            match serde_json::from_value::<SessionState>(value) {
                Ok(state) => {
                    store.insert(user_id, state);
                }
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        user_id = %user_id,
                        error = %e,
                        "skipping unreadable session entry"
                    );
                }
            }
        }

        Ok(store)
    }

    fn write_store(&self, store: &SessionStore) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, store)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| Error::Io(e.error))?;

        Ok(())
    }

    fn load_or_empty(&self) -> SessionStore {
        self.read_store().unwrap_or_else(|e| {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to read memory file, starting empty"
            );
            SessionStore::new()
        })
    }

    fn save_or_log(&self, store: &SessionStore) {
        match self.write_store(store) {
            Ok(()) => {
                tracing::debug!(
                    path = %self.path.display(),
                    users = store.len(),
                    "saved memory file"
                );
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to save memory file"
                );
            }
        }
    }
}

impl MemoryStore for JsonFileStore {
    fn load(&self) -> SessionStore {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        self.load_or_empty()
    }

    fn save(&self, store: &SessionStore) {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        self.save_or_log(store);
    }

    fn save_user(&self, user_id: &str, state: SessionState) {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let mut store = self.load_or_empty();
        store.insert(user_id.to_string(), state);
        self.save_or_log(&store);
    }

    fn remove_user(&self, user_id: &str) {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let mut store = self.load_or_empty();
        if store.remove(user_id).is_some() {
            self.save_or_log(&store);
        }
    }
}
