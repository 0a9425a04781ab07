//! `SQLite`-backed memory store with one row per user

use chrono::Utc;

use super::MemoryStore;
use crate::db::{DbConn, DbPool};
use crate::session::{SessionState, SessionStore, Turn};
use crate::{Error, Result};

/// Keeps each user's session in its own row
///
/// Unlike [`super::JsonFileStore`], `save_user` only upserts the one row, so
/// concurrent requests for different users never overwrite each other.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Create a store over an initialized pool (see [`crate::db::init`])
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<DbConn> {
        self.pool.get().map_err(|e| Error::Database(e.to_string()))
    }

    fn read_all(&self) -> Result<SessionStore> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT user_id, preferred_language, history FROM sessions")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .filter_map(|row| {
                row.map_err(|e| tracing::warn!(error = %e, "skipping unreadable session row"))
                    .ok()
            });

        let mut store = SessionStore::new();
        for (user_id, preferred_language, history) in rows {
            match decode_state(preferred_language, &history) {
                Ok(state) => {
                    store.insert(user_id, state);
                }
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "skipping unreadable session row");
                }
            }
        }

        Ok(store)
    }

    fn read_one(&self, user_id: &str) -> Result<Option<SessionState>> {
        let conn = self.conn()?;
        let row = conn.query_row(
            "SELECT preferred_language, history FROM sessions WHERE user_id = ?1",
            [user_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        );

        match row {
            Ok((preferred_language, history)) => {
                decode_state(preferred_language, &history).map(Some)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn replace_all(&self, store: &SessionStore) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        tx.execute("DELETE FROM sessions", [])?;
        for (user_id, state) in store {
            let history = serde_json::to_string(&state.history)?;
            tx.execute(
                "INSERT INTO sessions (user_id, preferred_language, history, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![user_id, state.preferred_language, history, now],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn upsert(&self, user_id: &str, state: &SessionState) -> Result<()> {
        let conn = self.conn()?;
        let history = serde_json::to_string(&state.history)?;

        conn.execute(
            "INSERT INTO sessions (user_id, preferred_language, history, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                preferred_language = excluded.preferred_language,
                history = excluded.history,
                updated_at = excluded.updated_at",
            rusqlite::params![
                user_id,
                state.preferred_language,
                history,
                Utc::now().to_rfc3339()
            ],
        )?;

        Ok(())
    }

    fn delete(&self, user_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM sessions WHERE user_id = ?1", [user_id])?;
        Ok(())
    }
}

fn decode_state(preferred_language: String, history: &str) -> Result<SessionState> {
    let history: Vec<Turn> = serde_json::from_str(history)?;
    Ok(SessionState {
        preferred_language,
        history,
    })
}

impl MemoryStore for SqliteStore {
    fn load(&self) -> SessionStore {
        self.read_all().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read sessions, starting empty");
            SessionStore::new()
        })
    }

    fn save(&self, store: &SessionStore) {
        if let Err(e) = self.replace_all(store) {
            tracing::warn!(error = %e, "failed to save sessions");
        }
    }

    fn load_user(&self, user_id: &str) -> SessionState {
        match self.read_one(user_id) {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "failed to read session, using default");
                SessionState::default()
            }
        }
    }

    fn save_user(&self, user_id: &str, state: SessionState) {
        if let Err(e) = self.upsert(user_id, &state) {
            tracing::warn!(user_id, error = %e, "failed to save session");
        }
    }

    fn remove_user(&self, user_id: &str) {
        if let Err(e) = self.delete(user_id) {
            tracing::warn!(user_id, error = %e, "failed to remove session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn setup() -> SqliteStore {
        SqliteStore::new(init_memory().unwrap())
    }

    #[test]
    fn unknown_user_loads_default() {
        let store = setup();
        assert_eq!(store.load_user("u1"), SessionState::default());
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_user_upserts_single_row() {
        let store = setup();
        let first = SessionState {
            preferred_language: "en".to_string(),
            history: vec![Turn::user("hello"), Turn::assistant("hi there")],
        };
        store.save_user("u1", first.clone());
        store.save_user("u2", SessionState::default());

        let second = SessionState {
            preferred_language: "hi".to_string(),
            history: vec![Turn::user("namaste")],
        };
        store.save_user("u1", second.clone());

        assert_eq!(store.load_user("u1"), second);
        assert_eq!(store.load().len(), 2);
    }

    #[test]
    fn save_replaces_whole_mapping() {
        let store = setup();
        store.save_user("stale", SessionState::default());

        let mut sessions = SessionStore::new();
        sessions.insert(
            "u1".to_string(),
            SessionState {
                preferred_language: "hi".to_string(),
                history: vec![Turn::user("a"), Turn::assistant("b")],
            },
        );
        store.save(&sessions);

        assert_eq!(store.load(), sessions);
    }

    #[test]
    fn corrupt_row_is_skipped() {
        let store = setup();
        store.save_user("good", SessionState::default());
        {
            let conn = store.conn().unwrap();
            conn.execute(
                "INSERT INTO sessions (user_id, preferred_language, history) VALUES ('bad', 'en', 'oops')",
                [],
            )
            .unwrap();
        }

        let loaded = store.load();
        assert!(loaded.contains_key("good"));
        assert!(!loaded.contains_key("bad"));
        assert_eq!(store.load_user("bad"), SessionState::default());
    }

    #[test]
    fn row_with_null_column_is_skipped() {
        let store = setup();
        {
            // Relax the NOT NULL constraints so a NULL language can be stored
            let conn = store.conn().unwrap();
            conn.execute_batch(
                "DROP TABLE sessions;
                 CREATE TABLE sessions (
                     user_id TEXT PRIMARY KEY,
                     preferred_language TEXT,
                     history TEXT,
                     updated_at TEXT
                 );
                 INSERT INTO sessions (user_id, preferred_language, history)
                 VALUES ('null', NULL, '[]');",
            )
            .unwrap();
        }
        store.save_user("good", SessionState::default());

        let loaded = store.load();
        assert!(loaded.contains_key("good"));
        assert!(!loaded.contains_key("null"));
    }

    #[test]
    fn remove_user_deletes_row() {
        let store = setup();
        store.save_user("u1", SessionState::default());
        store.remove_user("u1");
        assert!(store.load().is_empty());
    }
}
