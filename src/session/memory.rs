//! In-memory session store with LRU eviction

use super::{Session, SessionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Default capacity before the least recently active session is evicted
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    max_sessions: usize,
}

impl InMemorySessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Make room for one more session
    fn evict_if_full(&self, sessions: &mut HashMap<String, Session>) {
        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .values()
                .min_by(|a, b| {
                    a.last_active_at
                        .cmp(&b.last_active_at)
                        .then_with(|| a.id.cmp(&b.id))
                })
                .map(|s| s.id.clone())
            else {
                break;
            };
            tracing::debug!(session_id = %oldest, "Evicting least recently active session");
            sessions.remove(&oldest);
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, id: &str, now: DateTime<Utc>) -> Result<Session, String> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(id) {
            return Ok(session.clone());
        }
        self.evict_if_full(&mut sessions);
        let session = Session::new(id, now);
        sessions.insert(id.to_string(), session.clone());
        tracing::debug!(session_id = %id, "Created session");
        Ok(session)
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, String> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn put(&self, session: &Session) -> Result<(), String> {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&session.id) {
            self.evict_if_full(&mut sessions);
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Field;
    use crate::session::SessionStatus;
    use crate::state_machine::Step;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_is_stable() {
        let store = InMemorySessionStore::default();
        let first = store.get_or_create("a", at(0)).await.unwrap();
        assert_eq!(first.message_count, 0);
        assert_eq!(first.step, None);

        let again = store.get_or_create("a", at(5)).await.unwrap();
        assert_eq!(again.created_at, at(0));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_put_does_not_touch_other_sessions() {
        let store = InMemorySessionStore::default();
        let mut a = store.get_or_create("a", at(0)).await.unwrap();
        let b = store.get_or_create("b", at(0)).await.unwrap();

        a.step = Some(Step::AwaitingUrgency);
        a.collected.insert(Field::Name, "Alice".to_string());
        store.put(&a).await.unwrap();

        assert_eq!(store.get("b").await.unwrap(), Some(b));
        assert_eq!(store.get("a").await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn test_touch_and_reset() {
        let store = InMemorySessionStore::default();
        assert!(store.touch("missing", at(1)).await.unwrap().is_none());
        assert!(store.reset("missing").await.unwrap().is_none());

        let mut s = store.get_or_create("a", at(0)).await.unwrap();
        s.step = Some(Step::EmergencyDetails);
        s.collected.insert(Field::Phone, "555-1234".to_string());
        store.put(&s).await.unwrap();

        let touched = store.touch("a", at(3)).await.unwrap().unwrap();
        assert_eq!(touched.message_count, 1);
        assert_eq!(touched.last_active_at, at(3));

        let reset = store.reset("a").await.unwrap().unwrap();
        assert_eq!(reset.step, None);
        assert!(reset.collected.is_empty());
        assert_eq!(reset.status, SessionStatus::Reset);
        assert_eq!(reset.message_count, 1);
        assert_eq!(store.get("a").await.unwrap(), Some(reset));
    }

    #[tokio::test]
    async fn test_evicts_least_recently_active() {
        let store = InMemorySessionStore::new(2);
        store.get_or_create("old", at(0)).await.unwrap();
        store.get_or_create("mid", at(1)).await.unwrap();
        store.touch("old", at(2)).await.unwrap();

        store.get_or_create("new", at(3)).await.unwrap();

        assert_eq!(store.len().await, 2);
        assert!(store.get("mid").await.unwrap().is_none());
        assert!(store.get("old").await.unwrap().is_some());
        assert!(store.get("new").await.unwrap().is_some());
    }
}
