//! SQLite-backed record store for spam statuses and tags.
//!
//! The pipeline consumes the relational store only through the read/write
//! helpers in [`spam`] and [`tags`]; everything else in the surrounding
//! platform (accounts, content, search) is out of scope here.

use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;

pub mod spam;
pub mod tags;

pub use spam::UserSpamRow;
pub use tags::{CleanupReport, TagCleanup};

/// Errors raised by record-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed affiliations for user {user_id}: {source}")]
    MalformedAffiliations {
        user_id: i64,
        source: serde_json::Error,
    },
    #[error("Tag cleanup batch failed and was rolled back: {0}")]
    CleanupTransaction(String),
}

/// Open (or create) the curation database and prepare the schema.
pub fn open(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    apply_pragmas(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Open an in-memory database with the full schema, for tests.
pub fn open_in_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    init_schema(&conn)?;
    Ok(conn)
}

fn apply_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys=ON;
         PRAGMA busy_timeout=5000;
         PRAGMA temp_store=MEMORY;",
    )?;
    Ok(())
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_spam_status (
            user_id INTEGER PRIMARY KEY,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            bio TEXT NOT NULL DEFAULT '',
            research_interests TEXT NOT NULL DEFAULT '',
            personal_url TEXT NOT NULL DEFAULT '',
            professional_url TEXT NOT NULL DEFAULT '',
            affiliations TEXT NOT NULL DEFAULT '[]',
            is_active INTEGER NOT NULL DEFAULT 0,
            labelled_by_curator INTEGER,
            labelled_by_text_classifier INTEGER,
            text_classifier_confidence REAL,
            labelled_by_user_classifier INTEGER,
            user_classifier_confidence REAL,
            is_training_data INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS tag (
            name TEXT PRIMARY KEY
        ) WITHOUT ROWID;

        CREATE TABLE IF NOT EXISTS tagged_item (
            content_type TEXT NOT NULL,
            object_id INTEGER NOT NULL,
            tag_name TEXT NOT NULL REFERENCES tag(name),
            PRIMARY KEY (content_type, object_id, tag_name)
        ) WITHOUT ROWID;

        CREATE TABLE IF NOT EXISTS canonical_tag (
            name TEXT PRIMARY KEY
        ) WITHOUT ROWID;

        CREATE TABLE IF NOT EXISTS canonical_tag_mapping (
            tag_name TEXT PRIMARY KEY,
            canonical_name TEXT NOT NULL REFERENCES canonical_tag(name),
            confidence_score REAL NOT NULL
        ) WITHOUT ROWID;

        CREATE TABLE IF NOT EXISTS tag_cleanup_transaction (
            id INTEGER PRIMARY KEY,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tag_cleanup (
            id INTEGER PRIMARY KEY,
            old_name TEXT NOT NULL,
            new_name TEXT NOT NULL,
            transaction_id INTEGER REFERENCES tag_cleanup_transaction(id)
        );",
    )?;
    Ok(())
}

pub(crate) fn now_epoch_seconds() -> i64 {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn opens_and_bootstraps_schema_on_disk() {
        let dir = tempdir().unwrap();
        let conn = open(&dir.path().join("nested").join("curation.db")).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='user_spam_status'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn schema_bootstrap_is_idempotent() {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();
    }
}
