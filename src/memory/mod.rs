//! Persistent per-user conversational memory
//!
//! Memory is advisory: every operation here is infallible from the caller's
//! point of view. Unreadable data loads as empty and failed writes are
//! logged and dropped, so a broken store never breaks a conversation.

mod json;
mod sqlite;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use crate::Result;
use crate::config::{MemoryBackend, MemoryConfig};
use crate::db;
use crate::session::{SessionState, SessionStore};

/// Durable mapping from user id to [`SessionState`]
pub trait MemoryStore: Send + Sync {
    /// Read every stored session, or an empty mapping if nothing is readable
    fn load(&self) -> SessionStore;

    /// Replace every stored session with `store`
    fn save(&self, store: &SessionStore);

    /// Read one user's session, defaulting when the user is unknown
    fn load_user(&self, user_id: &str) -> SessionState {
        self.load().remove(user_id).unwrap_or_default()
    }

    /// Write one user's session
    ///
    /// The default reloads and rewrites the whole mapping, so concurrent
    /// writers for different users can lose an update.
    fn save_user(&self, user_id: &str, state: SessionState) {
        let mut store = self.load();
        store.insert(user_id.to_string(), state);
        self.save(&store);
    }

    /// Forget one user's session
    fn remove_user(&self, user_id: &str) {
        let mut store = self.load();
        if store.remove(user_id).is_some() {
            self.save(&store);
        }
    }
}

/// Open the configured store
///
/// # Errors
///
/// Returns error if the `SQLite` database cannot be opened or migrated
pub fn open(config: &MemoryConfig) -> Result<Arc<dyn MemoryStore>> {
    let store: Arc<dyn MemoryStore> = match config.backend {
        MemoryBackend::Json => Arc::new(JsonFileStore::new(&config.path)),
        MemoryBackend::Sqlite => Arc::new(SqliteStore::new(db::init(&config.path)?)),
    };

    tracing::info!(backend = ?config.backend, path = %config.path.display(), "memory store opened");
    Ok(store)
}
