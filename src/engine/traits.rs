//! Collaborator abstractions for the conversation engine
//!
//! The engine reaches persistence, alerting, time and id generation only
//! through these traits, so tests can swap in the mocks from `testing`.

use super::dispatch::NotificationError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Durable recording and alerting
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Append one record to a named table
    async fn append(&self, table: &str, fields: &[String]) -> Result<(), NotificationError>;

    /// Send an alert to the configured recipient
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotificationError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of fresh session ids
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    async fn append(&self, table: &str, fields: &[String]) -> Result<(), NotificationError> {
        (**self).append(table, fields).await
    }

    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotificationError> {
        (**self).notify(subject, body).await
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

impl<T: IdGenerator + ?Sized> IdGenerator for Arc<T> {
    fn next_id(&self) -> String {
        (**self).next_id()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

use crate::db::Database;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

#[derive(Serialize)]
struct AlertPayload<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Records go to SQLite; alerts go to a webhook, or to the log when none is set
#[derive(Clone)]
pub struct DatabaseSink {
    db: Database,
    client: reqwest::Client,
    webhook: Option<String>,
    recipient: String,
}

impl DatabaseSink {
    pub fn new(db: Database, webhook: Option<String>, recipient: impl Into<String>) -> Self {
        Self {
            db,
            client: reqwest::Client::new(),
            webhook,
            recipient: recipient.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for DatabaseSink {
    async fn append(&self, table: &str, fields: &[String]) -> Result<(), NotificationError> {
        let table = table.to_string();
        let fields = fields.to_vec();
        self.db
            .call(move |db| db.append_record(&table, &fields, Utc::now()))
            .await
            .map(|_| ())
            .map_err(|e| NotificationError::storage(e.to_string()))
    }

    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotificationError> {
        let Some(url) = &self.webhook else {
            tracing::warn!(
                to = %self.recipient,
                subject = %subject,
                body = %body,
                "No alert webhook configured, alert logged only"
            );
            return Ok(());
        };

        let payload = AlertPayload {
            to: &self.recipient,
            subject,
            body,
        };
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::delivery(format!("Webhook request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotificationError::delivery(format!(
                "Webhook returned {status}"
            )))
        }
    }
}

/// Logs duration and outcome of every sink call
pub struct LoggingSink<S> {
    inner: S,
}

impl<S: NotificationSink> LoggingSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

fn log_outcome(
    operation: &str,
    destination: &str,
    started: std::time::Instant,
    result: &Result<(), NotificationError>,
) {
    let duration = started.elapsed();
    match result {
        Ok(()) => {
            tracing::info!(
                operation,
                destination,
                duration_ms = %duration.as_millis(),
                "Notification call completed"
            );
        }
        Err(e) => {
            tracing::error!(
                operation,
                destination,
                duration_ms = %duration.as_millis(),
                kind = ?e.kind,
                error = %e.message,
                "Notification call failed"
            );
        }
    }
}

#[async_trait]
impl<S: NotificationSink> NotificationSink for LoggingSink<S> {
    async fn append(&self, table: &str, fields: &[String]) -> Result<(), NotificationError> {
        let started = std::time::Instant::now();
        let result = self.inner.append(table, fields).await;
        log_outcome("append", table, started, &result);
        result
    }

    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotificationError> {
        let started = std::time::Instant::now();
        let result = self.inner.notify(subject, body).await;
        log_outcome("notify", subject, started, &result);
        result
    }
}
