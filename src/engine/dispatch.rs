//! Effect dispatch with a bounded timeout
//!
//! Effects are awaited one after another, each under its own timeout. A
//! failure never aborts the remaining effects and never fails the turn; it
//! becomes a [`NotificationFailure`] annotation instead.

use super::traits::NotificationSink;
use crate::state_machine::Effect;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Timeout for each sink call unless configured otherwise
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Sink error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct NotificationError {
    pub kind: NotificationErrorKind,
    pub message: String,
}

impl NotificationError {
    pub fn new(kind: NotificationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(NotificationErrorKind::Timeout, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(NotificationErrorKind::Storage, message)
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        Self::new(NotificationErrorKind::Delivery, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationErrorKind {
    /// The call did not finish within the dispatch timeout
    Timeout,
    /// Record could not be persisted
    Storage,
    /// Alert could not be delivered
    Delivery,
}

/// Non-fatal annotation attached to a turn whose side effect failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationFailure {
    /// `append` or `notify`
    pub effect: &'static str,
    /// Table name or alert subject
    pub target: String,
    pub kind: NotificationErrorKind,
    pub message: String,
}

/// Run every effect against the sink, collecting failures
pub async fn dispatch_effects<N: NotificationSink + ?Sized>(
    sink: &N,
    effects: &[Effect],
    timeout: Duration,
    session_id: &str,
) -> Vec<NotificationFailure> {
    let mut failures = Vec::new();

    for effect in effects {
        let (target, result) = match effect {
            Effect::AppendRecord { table, fields } => (
                table.as_str(),
                tokio::time::timeout(timeout, sink.append(table, fields)).await,
            ),
            Effect::Notify { subject, body } => (
                subject.as_str(),
                tokio::time::timeout(timeout, sink.notify(subject, body)).await,
            ),
        };

        let error = match result {
            Ok(Ok(())) => {
                tracing::debug!(
                    session_id = %session_id,
                    effect = effect.kind(),
                    destination = target,
                    "Effect dispatched"
                );
                continue;
            }
            Ok(Err(e)) => e,
            Err(_) => NotificationError::timeout(format!(
                "{} did not complete within {}ms",
                effect.kind(),
                timeout.as_millis()
            )),
        };

        tracing::warn!(
            session_id = %session_id,
            effect = effect.kind(),
            destination = target,
            kind = ?error.kind,
            error = %error.message,
            "Effect failed"
        );
        failures.push(NotificationFailure {
            effect: effect.kind(),
            target: target.to_string(),
            kind: error.kind,
            message: error.message,
        });
    }

    failures
}
