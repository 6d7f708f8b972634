//! Key/blob stores backing the save slot.
//!
//! The engine writes its whole state under one key, so a store only needs
//! synchronous `get`/`set`/`remove` of byte blobs. Two implementations:
//!
//! - [`MemoryStore`]: a `HashMap`, for tests and throwaway sessions.
//! - [`SqliteStore`]: one row per key in a small `SQLite` table:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS save_slots (
//!     key        TEXT PRIMARY KEY,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```
//!
//! Each `set` is a single upsert, so a write either lands whole or not at all.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, params};
use tracing::{debug, info, warn};

use crate::config::{PersistenceConfig, StoreBackend};
use crate::error::Result;

// ---------------------------------------------------------------------------
// SaveStore
// ---------------------------------------------------------------------------

/// Synchronous key → blob storage.
pub trait SaveStore: Send {
    /// Read the blob stored under `key`.
    ///
    /// # Errors
    /// Backend failures.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `data` under `key`, replacing any previous blob.
    ///
    /// # Errors
    /// Backend failures.
    fn set(&mut self, key: &str, data: &[u8]) -> Result<()>;

    /// Delete `key`. Returns whether a blob existed.
    ///
    /// # Errors
    /// Backend failures.
    fn remove(&mut self, key: &str) -> Result<bool>;
}

/// Open the store selected by `config.backend`.
///
/// # Errors
/// Returns [`crate::QuestError::Database`] if the `SQLite` file cannot be
/// opened.
pub fn open_store(config: &PersistenceConfig) -> Result<Box<dyn SaveStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Box::new(MemoryStore::new())),
        StoreBackend::Sqlite => Ok(Box::new(SqliteStore::open(&config.path, config)?)),
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Volatile store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl SaveStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn set(&mut self, key: &str, data: &[u8]) -> Result<()> {
        self.blobs.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        Ok(self.blobs.remove(key).is_some())
    }
}

// ---------------------------------------------------------------------------
// CRC-32
// ---------------------------------------------------------------------------

/// CRC-32 (ISO 3309) of `data` as lowercase hex.
fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32(data))
}

fn crc32(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ POLY } else { crc >> 1 };
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS save_slots (
    key        TEXT PRIMARY KEY,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

/// `SQLite`-backed store.
pub struct SqliteStore {
    conn: Connection,
    checksum_enabled: bool,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .field("checksum_enabled", &self.checksum_enabled)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns [`crate::QuestError::Database`] on `SQLite` failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), wal = config.wal_mode, "save store opened");
        Ok(Self {
            conn,
            checksum_enabled: config.checksum_enabled,
            db_path,
        })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns [`crate::QuestError::Database`] on `SQLite` failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            checksum_enabled: config.checksum_enabled,
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Database path, or `:memory:`.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Copy the database to `dest` with the online-backup API.
    ///
    /// # Errors
    /// Returns [`crate::QuestError::Database`] on `SQLite` failures.
    pub fn backup<P: AsRef<Path>>(&self, dest: P) -> Result<()> {
        let start = Instant::now();
        let mut target = Connection::open(dest.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut target)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;
        info!(
            dest = %dest.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "save store backup completed"
        );
        Ok(())
    }

    /// `PRAGMA integrity_check`; `true` when the file is sound.
    ///
    /// # Errors
    /// Returns [`crate::QuestError::Database`] if the check cannot run.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self.conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

impl SaveStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT data, checksum FROM save_slots WHERE key = ?1")?;
        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![key], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;
        let Some((data, stored)) = row else {
            return Ok(None);
        };

        if self.checksum_enabled {
            if let Some(expected) = stored {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(key, %expected, %actual, "save checksum mismatch, data may be corrupt");
                }
            }
        }
        debug!(key, bytes = data.len(), "save blob read");
        Ok(Some(data))
    }

    fn set(&mut self, key: &str, data: &[u8]) -> Result<()> {
        let checksum = self.checksum_enabled.then(|| crc32_hex(data));
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO save_slots (key, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![key, data, now, checksum],
        )?;
        debug!(key, bytes = data.len(), "save blob written");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM save_slots WHERE key = ?1", params![key])?;
        Ok(deleted > 0)
    }
}

/// `.optional()` for `rusqlite` results: `QueryReturnedNoRows` becomes `None`.
trait OptionalExt<T> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
