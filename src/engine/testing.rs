//! Mock collaborators for testing
//!
//! These mocks let the engine run whole conversations without real I/O.

use super::dispatch::NotificationError;
use super::traits::{Clock, IdGenerator, NotificationSink};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Recording Sink
// ============================================================================

/// Sink that records every call and fails on demand
pub struct RecordingSink {
    appends: Mutex<Vec<(String, Vec<String>)>>,
    notifications: Mutex<Vec<(String, String)>>,
    append_failures: Mutex<VecDeque<NotificationError>>,
    notify_failures: Mutex<VecDeque<NotificationError>>,
    delay: Option<Duration>,
    /// Notified when a call starts (for test synchronization)
    pub call_started: Arc<Notify>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            appends: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
            append_failures: Mutex::new(VecDeque::new()),
            notify_failures: Mutex::new(VecDeque::new()),
            delay: None,
            call_started: Arc::new(Notify::new()),
        }
    }

    /// Sleep this long inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_next_append(&self, error: NotificationError) {
        self.append_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_notify(&self, error: NotificationError) {
        self.notify_failures.lock().unwrap().push_back(error);
    }

    pub fn appends(&self) -> Vec<(String, Vec<String>)> {
        self.appends.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn appends_to(&self, table: &str) -> Vec<Vec<String>> {
        self.appends()
            .into_iter()
            .filter(|(t, _)| t == table)
            .map(|(_, fields)| fields)
            .collect()
    }

    async fn pause(&self) {
        self.call_started.notify_waiters();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn append(&self, table: &str, fields: &[String]) -> Result<(), NotificationError> {
        self.appends
            .lock()
            .unwrap()
            .push((table.to_string(), fields.to_vec()));
        self.pause().await;
        match self.append_failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotificationError> {
        self.notifications
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        self.pause().await;
        match self.notify_failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Clock and ids
// ============================================================================

/// Clock pinned to one instant
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Ids `session-1`, `session-2`, ...
#[derive(Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        format!("session-{n}")
    }
}
