//! Database layer for the clinic document store.

mod documents;
mod schema;

pub use documents::*;
pub use schema::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Single SQLite connection holding every collection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the store file, creating and migrating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Self::with_connection(conn)
    }

    /// In-memory store, dropped with the value.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> DbResult<Self> {
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> DbResult<()> {
        let version = self.schema_version()?;
        if version > SCHEMA_VERSION {
            return Err(DbError::Constraint(format!(
                "store schema v{} is newer than supported v{}",
                version, SCHEMA_VERSION
            )));
        }

        self.conn.execute_batch(SCHEMA)?;
        if version < SCHEMA_VERSION {
            self.conn
                .pragma_update(None, "user_version", SCHEMA_VERSION)?;
            tracing::debug!(from = version, to = SCHEMA_VERSION, "Document store schema initialized");
        }
        Ok(())
    }

    /// `user_version` recorded in the store file.
    pub fn schema_version(&self) -> DbResult<u32> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}
