use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rusqlite::config::DbConfig;
use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::config::{ConfigPaths, StorageOptions};

mod memory;
mod schema;

pub use memory::MemoryStore;

/// Serialized note collection.
pub const MEMOS_KEY: &str = "memos";
/// `"light"` or `"dark"`.
pub const THEME_KEY: &str = "theme";
/// Rolling hash of the session password.
pub const PASSWORD_HASH_KEY: &str = "memoPasswordHash";

/// String-keyed store the application mirrors its state into.
///
/// Every `set` is a single write; callers never batch or stage changes.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WalCheckpointStats {
    pub busy_frames: i64,
    pub wal_frames: i64,
    pub checkpointed_frames: i64,
}

#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl StorageHandle {
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    pub fn run_wal_health_check(&self) -> Result<WalCheckpointStats> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare("PRAGMA wal_checkpoint(PASSIVE)")
                .context("preparing wal checkpoint pragma")?;
            let mut rows = stmt.query([]).context("executing wal checkpoint pragma")?;
            if let Some(row) = rows.next()? {
                Ok(WalCheckpointStats {
                    busy_frames: row.get(0)?,
                    wal_frames: row.get(1)?,
                    checkpointed_frames: row.get(2)?,
                })
            } else {
                bail!("wal checkpoint returned no rows");
            }
        })
    }

    /// Keys currently present, in key order.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()
                .context("listing store keys")?;
            Ok(keys)
        })
    }
}

impl KeyValueStore for StorageHandle {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .with_context(|| format!("reading key {key}"))
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_connection(|conn| {
            let now = OffsetDateTime::now_utc().unix_timestamp();
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, now],
            )
            .with_context(|| format!("writing key {key}"))?;
            tracing::trace!(key, bytes = value.len(), "stored value");
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
                .with_context(|| format!("removing key {key}"))?;
            Ok(())
        })
    }
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<StorageHandle> {
    let db_path = if storage.database_path.as_os_str().is_empty() {
        &paths.database_path
    } else {
        &storage.database_path
    };
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    tracing::debug!(path = %db_path.display(), "store ready");
    Ok(StorageHandle {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)
        .context("enabling foreign keys")?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_storage() -> anyhow::Result<(TempDir, StorageHandle)> {
        let temp = TempDir::new()?;
        let root = temp.path();
        let paths = ConfigPaths::rooted(
            root.join("config"),
            root.join("config/config.toml"),
            root.join("data"),
        );
        let mut options = StorageOptions::default();
        options.database_path = paths.database_path.clone();
        let storage = init(&paths, &options)?;
        Ok((temp, storage))
    }

    #[test]
    fn set_overwrites_existing_value() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        assert_eq!(storage.get(MEMOS_KEY)?, None);
        storage.set(MEMOS_KEY, "[]")?;
        storage.set(MEMOS_KEY, "[1]")?;
        assert_eq!(storage.get(MEMOS_KEY)?.as_deref(), Some("[1]"));
        assert_eq!(storage.keys()?, vec![MEMOS_KEY.to_string()]);
        Ok(())
    }

    #[test]
    fn remove_is_idempotent() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        storage.set(THEME_KEY, "dark")?;
        storage.remove(THEME_KEY)?;
        storage.remove(THEME_KEY)?;
        assert_eq!(storage.get(THEME_KEY)?, None);
        Ok(())
    }

    #[test]
    fn values_survive_reopening() -> anyhow::Result<()> {
        let (temp, storage) = init_storage()?;
        storage.set(PASSWORD_HASH_KEY, "92599395")?;
        drop(storage);

        let root = temp.path();
        let paths = ConfigPaths::rooted(
            root.join("config"),
            root.join("config/config.toml"),
            root.join("data"),
        );
        let reopened = init(&paths, &StorageOptions::default())?;
        assert_eq!(
            reopened.get(PASSWORD_HASH_KEY)?.as_deref(),
            Some("92599395")
        );
        Ok(())
    }

    #[test]
    fn wal_health_check_runs() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let stats = storage.run_wal_health_check()?;
        assert!(
            stats.busy_frames >= 0 && stats.wal_frames >= 0 && stats.checkpointed_frames >= 0,
            "expected non-negative wal stats, got {:?}",
            stats
        );
        Ok(())
    }
}
