use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;
use tracing::{debug, info};

/// Key the grid is saved under
pub const GRID_STATE_KEY: &str = "images";

/// Errors from the local state store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("saved state is not valid: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Join(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable key-value persistence that outlives the process
///
/// Last write wins; no transactions or versioning.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;
}

/// The Library keeps saved app state in a SQLite database.
///
/// Each call opens its own connection on a blocking thread:
/// rusqlite::Connection is not Sync, so it can't be shared across tasks.
pub struct SqliteStateStore {
    db_path: PathBuf,
}

impl SqliteStateStore {
    /// Open (or create) the database at `db_path` and initialize the schema.
    pub fn open(db_path: PathBuf) -> StoreResult<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        init_schema(&conn)?;

        info!("📁 State database initialized at: {}", db_path.display());

        Ok(Self { db_path })
    }

    /// Get the path where the database should be stored under `data_dir`
    ///
    /// With the default data dir this is:
    /// - Linux: ~/.local/share/slot-gallery/slot_gallery.db
    /// - macOS: ~/Library/Application Support/slot-gallery/slot_gallery.db
    /// - Windows: %APPDATA%\slot-gallery\slot_gallery.db
    pub fn db_path_in(data_dir: &Path) -> PathBuf {
        data_dir.join("slot_gallery.db")
    }

    async fn with_connection<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            op(&conn)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

/// Creates the key-value table if it doesn't exist.
fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key             TEXT PRIMARY KEY,
            value           TEXT NOT NULL,
            updated_at      INTEGER NOT NULL
        )",
        [],
    )?;
    Ok(())
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            let value = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", [&key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                rusqlite::params![&key, &value, Utc::now().timestamp()],
            )?;
            debug!("Saved {} bytes under '{}'", value.len(), key);
            Ok(())
        })
        .await
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for SqliteStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStateStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}

/// Process-local store, used when the database can't be opened
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
