//! SQLite-backed tag store
//!
//! [`SqliteStore`] owns one connection and hands it out either read-only or
//! inside an immediate transaction. Row-level primitives live in the
//! [`TagRows`], [`EdgeRows`], [`NormalizationRows`] and [`ContentIndex`] traits,
//! implemented for [`rusqlite::Connection`] so they work the same on a plain
//! connection and inside a [`rusqlite::Transaction`].

mod content;
mod edges;
mod normalizations;
mod tags;

pub use content::ContentIndex;
pub use edges::EdgeRows;
pub use normalizations::{NewNormalization, NormalizationRows};
pub use tags::TagRows;

use crate::domain::{
    ContentId, NormalizationId, NormalizationSource, RelationshipType, ReviewStatus, TagId,
    TagType,
};
use crate::error::Result;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tags (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  name_key TEXT NOT NULL UNIQUE,
  tag_type TEXT NOT NULL,
  description TEXT,
  is_featured INTEGER NOT NULL DEFAULT 0,
  is_private INTEGER NOT NULL DEFAULT 0,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tag_edges (
  parent_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
  child_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
  relationship_type TEXT NOT NULL,
  created_at TEXT NOT NULL,
  PRIMARY KEY (parent_id, child_id),
  CHECK (parent_id <> child_id)
);
CREATE INDEX IF NOT EXISTS idx_tag_edges_child ON tag_edges(child_id);

CREATE TABLE IF NOT EXISTS tag_normalizations (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  original_name TEXT NOT NULL,
  original_key TEXT NOT NULL,
  normalized_name TEXT NOT NULL,
  description TEXT,
  parent_candidate_ids TEXT NOT NULL DEFAULT '[]',
  review_status TEXT NOT NULL,
  source TEXT NOT NULL,
  confidence_score REAL NOT NULL,
  auto_approved INTEGER NOT NULL DEFAULT 0,
  approved_tag_id INTEGER REFERENCES tags(id) ON DELETE SET NULL,
  reviewed_by TEXT,
  reviewed_at TEXT,
  admin_notes TEXT,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_normalizations_status ON tag_normalizations(review_status);
CREATE INDEX IF NOT EXISTS idx_normalizations_original ON tag_normalizations(original_key);
CREATE INDEX IF NOT EXISTS idx_normalizations_tag ON tag_normalizations(approved_tag_id);

CREATE TABLE IF NOT EXISTS content_items (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  title TEXT NOT NULL,
  description TEXT,
  metadata TEXT,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS content_tags (
  content_id INTEGER NOT NULL REFERENCES content_items(id) ON DELETE CASCADE,
  tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
  created_at TEXT NOT NULL,
  PRIMARY KEY (content_id, tag_id)
);
CREATE INDEX IF NOT EXISTS idx_content_tags_tag ON content_tags(tag_id);
"#;

/// Default wait for a competing writer before giving up
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable store for tags, edges, normalizations and content associations.
///
/// Safe to share across threads; several stores may also open the same file.
/// Writers are serialized by SQLite through `BEGIN IMMEDIATE`.
#[derive(Debug)]
pub struct SqliteStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and migrate) a database file
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self::from_connection(conn, Some(path.to_path_buf()))?;
        debug!(path = %path.display(), "opened tag store");
        Ok(store)
    }

    /// Private in-memory database, mostly for tests
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Database file, if this store is file-backed
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panicking holder cannot leave an open transaction behind: dropping
        // the Transaction rolls it back.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the connection outside of any explicit transaction
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock();
        f(&conn)
    }

    /// Run `f` inside an immediate transaction.
    ///
    /// Commits when `f` returns `Ok`; any error rolls everything back, so a
    /// failed operation leaves the store untouched.
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

macro_rules! sql_id {
    ($ty:ident) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map($ty)
            }
        }
    };
}

macro_rules! sql_enum {
    ($ty:ident) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                $ty::from_str(text).map_err(|e| FromSqlError::Other(e.into()))
            }
        }
    };
}

sql_id!(TagId);
sql_id!(ContentId);
sql_id!(NormalizationId);

sql_enum!(TagType);
sql_enum!(RelationshipType);
sql_enum!(ReviewStatus);
sql_enum!(NormalizationSource);
