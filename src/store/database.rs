//! Database connection management and schema creation.
//!
//! The [`Database`] owns one [`rusqlite::Connection`] behind an async mutex.
//! Stores acquire the guard per operation and release it before any network
//! await, so no lock spans a model call.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tokio::sync::{Mutex, MutexGuard};

use crate::store::error::StoreResult;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the given path and ensure the schema
    /// exists. Foreign keys are enforced; cascade delete from conversations
    /// to messages depends on it.
    pub fn open_at<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        create_tables(&conn)?;

        tracing::info!(path = %path.as_ref().display(), "database ready");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection for one operation.
    pub async fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

fn create_tables(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            hashed_password TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS conversations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users (id),
            title TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id INTEGER NOT NULL
                REFERENCES conversations (id) ON DELETE CASCADE,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_user_id
            ON conversations (user_id);
        CREATE INDEX IF NOT EXISTS idx_messages_conversation_id
            ON messages (conversation_id);",
    )?;

    Ok(())
}

/// Parse an RFC3339 timestamp column.
pub(crate) fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                column,
                "created_at".to_string(),
                rusqlite::types::Type::Text,
            )
        })
}
