//! SQLite persistence for the conversation store and the compression level.
//!
//! A small key/value table holds one JSON-serialized `ConversationStore`
//! and one integer level, each under a fixed key. Uses `rusqlite` in
//! synchronous mode; callers keep the handle behind a `std::sync::Mutex`.

use rusqlite::{params, Connection, OptionalExtension};

use super::errors::SummaryError;
use super::level::CompressionLevel;
use super::types::ConversationStore;

/// Storage key for the serialized conversation store.
pub const CONVERSATION_KEY: &str = "chat_sessions";

/// Storage key for the compression level.
pub const LEVEL_KEY: &str = "summary_level";

// ─── Database ───────────────────────────────────────────────────────────────

/// SQLite database handle for chat state.
pub struct ChatDatabase {
    conn: Connection,
}

impl ChatDatabase {
    /// Open (or create) the database at the given path.
    ///
    /// Pass `":memory:"` for an in-memory database (tests).
    pub fn open(path: &str) -> Result<Self, SummaryError> {
        let conn = Connection::open(path)?;

        // WAL has no effect on :memory: but is harmless there.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let db = Self { conn };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> Result<(), SummaryError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )?;
        Ok(())
    }

    // ─── Raw key/value ──────────────────────────────────────────────────

    fn put(&self, key: &str, value: &str) -> Result<(), SummaryError> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, SummaryError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    // ─── Conversation store ─────────────────────────────────────────────

    /// Persist the whole conversation store.
    pub fn save_store(&self, store: &ConversationStore) -> Result<(), SummaryError> {
        let json = serde_json::to_string(store)?;
        self.put(CONVERSATION_KEY, &json)
    }

    /// Load the conversation store, if one was saved.
    pub fn load_store(&self) -> Result<Option<ConversationStore>, SummaryError> {
        match self.get(CONVERSATION_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    // ─── Level ──────────────────────────────────────────────────────────

    /// Persist the compression level.
    pub fn save_level(&self, level: CompressionLevel) -> Result<(), SummaryError> {
        self.put(LEVEL_KEY, &level.to_string())
    }

    /// Raw stored level text. Parsing and clamping belong to
    /// [`CompressionLevel::load`].
    pub fn load_level_raw(&self) -> Result<Option<String>, SummaryError> {
        self.get(LEVEL_KEY)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary_core::types::ChatTurn;

    #[test]
    fn test_empty_database_loads_nothing() {
        let db = ChatDatabase::open(":memory:").unwrap();
        assert!(db.load_store().unwrap().is_none());
        assert!(db.load_level_raw().unwrap().is_none());
    }

    #[test]
    fn test_store_overwrites_previous() {
        let db = ChatDatabase::open(":memory:").unwrap();

        let mut store = ConversationStore::new();
        store.push_user("first");
        db.save_store(&store).unwrap();

        store.push_agent("second");
        store.current_archive = Some("archive".into());
        db.save_store(&store).unwrap();

        let loaded = db.load_store().unwrap().unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_file_backed_database_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("chat.db");
        let path = path.to_string_lossy().into_owned();

        {
            let db = ChatDatabase::open(&path).unwrap();
            let mut store = ConversationStore::new();
            store.turns.push(ChatTurn::summary_artifact("kept"));
            db.save_store(&store).unwrap();
            db.save_level(CompressionLevel::from(8)).unwrap();
        }

        let db = ChatDatabase::open(&path).unwrap();
        let store = db.load_store().unwrap().unwrap();
        assert_eq!(store.turns.len(), 1);
        assert!(store.turns[0].is_summary_artifact);
        assert_eq!(db.load_level_raw().unwrap().as_deref(), Some("8"));
    }

    #[test]
    fn test_corrupt_store_is_storage_error() {
        let db = ChatDatabase::open(":memory:").unwrap();
        db.put(CONVERSATION_KEY, "{not json").unwrap();
        assert!(matches!(
            db.load_store(),
            Err(SummaryError::Storage { .. })
        ));
    }
}
