//! Database module for the intake service
//!
//! Stores appended intake records and, optionally, session snapshots.

mod schema;

pub use schema::Record;

use schema::SCHEMA;

use crate::session::Session;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the blocking pool so async callers never wait on the connection lock
    pub async fn call<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Database) -> DbResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    /// Hold the connection lock on another thread for `duration`
    #[cfg(test)]
    pub(crate) fn hold_lock(&self, duration: std::time::Duration) -> std::thread::JoinHandle<()> {
        let db = self.clone();
        let (locked, acquired) = std::sync::mpsc::channel();
        let handle = std::thread::spawn(move || {
            let _conn = db.conn();
            locked.send(()).unwrap();
            std::thread::sleep(duration);
        });
        acquired.recv().unwrap();
        handle
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Record Operations ====================

    /// Append one record to a named table
    pub fn append_record(
        &self,
        table: &str,
        fields: &[String],
        now: DateTime<Utc>,
    ) -> DbResult<Record> {
        let conn = self.conn();
        let fields_json = serde_json::to_string(fields)?;
        conn.execute(
            "INSERT INTO records (table_name, fields, created_at) VALUES (?1, ?2, ?3)",
            params![table, fields_json, now.to_rfc3339()],
        )?;

        Ok(Record {
            id: conn.last_insert_rowid(),
            table: table.to_string(),
            fields: fields.to_vec(),
            created_at: now,
        })
    }

    /// All records of a table in append order
    pub fn list_records(&self, table: &str) -> DbResult<Vec<Record>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, table_name, fields, created_at FROM records
             WHERE table_name = ?1 ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![table], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, table, fields_json, created_at) = row?;
            records.push(Record {
                id,
                table,
                fields: serde_json::from_str(&fields_json)?,
                created_at: parse_datetime(&created_at),
            });
        }
        Ok(records)
    }

    // ==================== Session Operations ====================

    /// Insert or replace a session snapshot
    pub fn save_session(&self, session: &Session) -> DbResult<()> {
        let data = serde_json::to_string(session)?;
        self.conn().execute(
            "INSERT INTO sessions (id, data, last_active_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, last_active_at = excluded.last_active_at",
            params![session.id, data, session.last_active_at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn load_session(&self, id: &str) -> DbResult<Option<Session>> {
        let data: Option<String> = self
            .conn()
            .query_row(
                "SELECT data FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn count_sessions(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
