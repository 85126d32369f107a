//! SQLite-backed session store

use super::{Session, SessionStore};
use crate::db::Database;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Sessions persisted as JSON snapshots in the `sessions` table
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: Database,
}

impl SqliteSessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get_or_create(&self, id: &str, now: DateTime<Utc>) -> Result<Session, String> {
        let key = id.to_string();
        let (session, created) = self
            .db
            .call(move |db| {
                if let Some(session) = db.load_session(&key)? {
                    return Ok((session, false));
                }
                let session = Session::new(key, now);
                db.save_session(&session)?;
                Ok((session, true))
            })
            .await
            .map_err(|e| e.to_string())?;
        if created {
            tracing::debug!(session_id = %id, "Created session");
        }
        Ok(session)
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, String> {
        let key = id.to_string();
        self.db
            .call(move |db| db.load_session(&key))
            .await
            .map_err(|e| e.to_string())
    }

    async fn put(&self, session: &Session) -> Result<(), String> {
        let session = session.clone();
        self.db
            .call(move |db| db.save_session(&session))
            .await
            .map_err(|e| e.to_string())
    }
}
