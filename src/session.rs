//! Per-session conversation records and their stores
//!
//! A session is created on first reference and only mutated by the engine
//! while it holds that session's turn lock.

pub mod memory;
mod sqlite;

pub use memory::InMemorySessionStore;
pub use sqlite::SqliteSessionStore;

use crate::extract::Entities;
use crate::state_machine::Step;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

/// Default bound on `intent_history`
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// `None` between flows
    pub step: Option<Step>,
    pub collected: Entities,
    /// Most recent last
    pub intent_history: VecDeque<String>,
    pub message_count: u64,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            step: None,
            collected: Entities::new(),
            intent_history: VecDeque::new(),
            message_count: 0,
            status: SessionStatus::Active,
            created_at: now,
            last_active_at: now,
        }
    }

    /// Count one inbound turn
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_active_at = now;
        self.message_count += 1;
    }

    pub fn record_intent(&mut self, tag: &str, limit: usize) {
        self.intent_history.push_back(tag.to_string());
        while self.intent_history.len() > limit.max(1) {
            self.intent_history.pop_front();
        }
    }

    /// Start a new flow, discarding data from the previous one
    pub fn begin_flow(&mut self) {
        self.collected.clear();
        self.status = SessionStatus::Active;
    }

    /// Abort any flow in progress
    pub fn reset(&mut self) {
        self.step = None;
        self.collected.clear();
        self.status = SessionStatus::Reset;
    }
}

/// Storage for sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a session, creating a fresh one on first reference
    async fn get_or_create(&self, id: &str, now: DateTime<Utc>) -> Result<Session, String>;

    async fn get(&self, id: &str) -> Result<Option<Session>, String>;

    /// Write back a session (keyed by `session.id`)
    async fn put(&self, session: &Session) -> Result<(), String>;

    /// Update `last_active_at` and count a turn; `None` for unknown ids
    async fn touch(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Session>, String> {
        let Some(mut session) = self.get(id).await? else {
            return Ok(None);
        };
        session.touch(now);
        self.put(&session).await?;
        Ok(Some(session))
    }

    /// Clear step and collected data, status `Reset`; `None` for unknown ids
    async fn reset(&self, id: &str) -> Result<Option<Session>, String> {
        let Some(mut session) = self.get(id).await? else {
            return Ok(None);
        };
        session.reset();
        self.put(&session).await?;
        Ok(Some(session))
    }
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn get_or_create(&self, id: &str, now: DateTime<Utc>) -> Result<Session, String> {
        (**self).get_or_create(id, now).await
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, String> {
        (**self).get(id).await
    }

    async fn put(&self, session: &Session) -> Result<(), String> {
        (**self).put(session).await
    }

    async fn touch(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Session>, String> {
        (**self).touch(id, now).await
    }

    async fn reset(&self, id: &str) -> Result<Option<Session>, String> {
        (**self).reset(id).await
    }
}

/// Entries kept before idle locks are pruned
const LOCK_PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per session id, serializing turns for that id
#[derive(Default)]
pub struct TurnLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TurnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Other ids are unaffected.
    pub async fn acquire(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() >= LOCK_PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of ids with a lock entry
    pub fn tracked_ids(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Field;
    use chrono::TimeZone;
    use std::time::Duration;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap()
    }

    #[test]
    fn test_touch_counts_turns() {
        let mut session = Session::new("a", at(0));
        session.touch(at(5));
        session.touch(at(7));
        assert_eq!(session.message_count, 2);
        assert_eq!(session.last_active_at, at(7));
        assert_eq!(session.created_at, at(0));
    }

    #[test]
    fn test_intent_history_is_bounded() {
        let mut session = Session::new("a", at(0));
        for i in 0..5 {
            session.record_intent(&format!("t{i}"), 3);
        }
        assert_eq!(
            session.intent_history.iter().collect::<Vec<_>>(),
            vec!["t2", "t3", "t4"]
        );
    }

    #[test]
    fn test_reset_clears_flow() {
        let mut session = Session::new("a", at(0));
        session.step = Some(Step::EmergencyDetails);
        session.collected.insert(Field::Phone, "555".to_string());
        session.reset();
        assert_eq!(session.step, None);
        assert!(session.collected.is_empty());
        assert_eq!(session.status, SessionStatus::Reset);
    }

    #[test]
    fn test_session_json_shape() {
        let mut session = Session::new("a", at(0));
        session.step = Some(Step::AwaitingUrgency);
        session.collected.insert(Field::Name, "Alice".to_string());
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["step"], "awaiting_urgency");
        assert_eq!(json["status"], "active");
        assert_eq!(json["collected"]["name"], "Alice");
    }

    #[tokio::test]
    async fn test_turn_locks_serialize_same_id() {
        let locks = Arc::new(TurnLocks::new());
        let guard = locks.acquire("a").await;

        // A different id is not blocked
        let other = tokio::time::timeout(Duration::from_millis(50), locks.acquire("b")).await;
        assert!(other.is_ok());

        // The same id waits until the guard drops
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.acquire("a")).await;
        assert!(blocked.is_err());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(50), locks.acquire("a")).await;
        assert!(reacquired.is_ok());
        assert_eq!(locks.tracked_ids(), 2);
    }
}
