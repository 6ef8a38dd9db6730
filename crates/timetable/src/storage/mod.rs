//! `SQLite` storage for per-user timetables.
//!
//! Every user has one row holding their item list as JSON. Writes go through
//! a read-modify-write inside a transaction, and the list is stored as a
//! whole, so the last write for a user wins.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::item::{Change, ItemId, TimetableItem, UserId};
use crate::session::TimetableStore;

/// Storage engine for timetables.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection, shared between async callers.
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    /// Load a user's items. Users without a timetable get an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored list is not valid JSON.
    pub fn load_items(&self, user: &UserId) -> Result<Vec<TimetableItem>> {
        let conn = self.conn()?;
        read_items(&conn, user)
    }

    /// Apply one change to a user's stored list and return the new list.
    ///
    /// Added items with a temporary id get a persisted id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn modify_items(&self, user: &UserId, change: &Change) -> Result<Vec<TimetableItem>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut items = read_items(&tx, user)?;
        match change {
            Change::Add(item) => {
                let mut item = item.clone();
                assign_persisted_id(user, &mut item);
                Change::Add(item).apply_to(&mut items);
            }
            Change::Update(_) | Change::Delete(_) => change.apply_to(&mut items),
        }
        write_items(&tx, user, &items)?;
        tx.commit()?;

        debug!(user = %user, action = change.action(), items = items.len(), "Stored change");
        Ok(items)
    }

    /// Replace a user's whole list and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn replace_items(
        &self,
        user: &UserId,
        items: &[TimetableItem],
    ) -> Result<Vec<TimetableItem>> {
        let mut items = items.to_vec();
        for item in &mut items {
            assign_persisted_id(user, item);
        }

        let conn = self.conn()?;
        write_items(&conn, user, &items)?;

        info!(user = %user, items = items.len(), "Replaced timetable");
        Ok(items)
    }

    /// Number of writes made to a user's timetable, 0 if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn revision(&self, user: &UserId) -> Result<i64> {
        let revision = self
            .conn()?
            .query_row(
                "SELECT revision FROM timetables WHERE user_id = ?1",
                [user.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(revision.unwrap_or(0))
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let conn = self.conn()?;

        let (timetables, total_items): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(json_array_length(items)), 0) FROM timetables",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let newest: Option<String> = conn
            .query_row(
                "SELECT updated_at FROM timetables ORDER BY updated_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let last_updated = newest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            timetables,
            total_items,
            last_updated,
            db_size_bytes,
        })
    }
}

fn read_items(conn: &Connection, user: &UserId) -> Result<Vec<TimetableItem>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT items FROM timetables WHERE user_id = ?1",
            [user.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    match json {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

fn write_items(conn: &Connection, user: &UserId, items: &[TimetableItem]) -> Result<()> {
    let json = serde_json::to_string(items)?;
    conn.execute(
        r"
        INSERT INTO timetables (user_id, items, updated_at, revision)
        VALUES (?1, ?2, ?3, 1)
        ON CONFLICT(user_id) DO UPDATE SET
            items = excluded.items,
            updated_at = excluded.updated_at,
            revision = timetables.revision + 1
        ",
        params![user.as_str(), json, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn assign_persisted_id(user: &UserId, item: &mut TimetableItem) {
    if item.id.is_temporary() {
        let id = ItemId::persisted(user, &item.id, Utc::now().timestamp_millis());
        debug!(temporary = %item.id, persisted = %id, "Assigned item id");
        item.id = id;
    }
}

#[async_trait]
impl TimetableStore for Storage {
    async fn load(&self, user: &UserId) -> Result<Vec<TimetableItem>> {
        self.load_items(user)
    }

    async fn modify(&self, user: &UserId, change: &Change) -> Result<Vec<TimetableItem>> {
        self.modify_items(user, change)
    }

    async fn replace(&self, user: &UserId, items: &[TimetableItem]) -> Result<Vec<TimetableItem>> {
        self.replace_items(user, items)
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of users with a stored timetable.
    pub timetables: i64,
    /// Items across all timetables.
    pub total_items: i64,
    /// Time of the most recent write.
    pub last_updated: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
