//! Conversation engine
//!
//! One call to [`ConversationEngine::handle_turn`] is one turn: load or
//! create the session, extract fields, classify the intent, run the pure
//! transition, write the session back, then dispatch the transition's
//! effects. Turns for the same session id are serialized; the session lock
//! is released before effects are dispatched.

mod dispatch;
mod response;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use dispatch::{
    dispatch_effects, NotificationError, NotificationErrorKind, NotificationFailure,
    DEFAULT_NOTIFY_TIMEOUT,
};
pub use traits::*;

use crate::extract::{EntityExtractor, Field};
use crate::intent::{classify, default_catalog, IntentCatalog, IntentDefinition, IntentEntry};
use crate::session::{Session, SessionStatus, SessionStore, TurnLocks, DEFAULT_HISTORY_LIMIT};
use crate::state_machine::{transition, Lifecycle, Step, Turn, TurnContext};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Session store error: {0}")]
    Store(String),
}

/// Tunables for the engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub history_limit: usize,
    pub notify_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }
}

/// Result of one turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub response: String,
    pub session_id: String,
    pub step: Option<Step>,
    /// The turn moved the session from a flow back to idle
    pub conversation_complete: bool,
    /// Classified intent; `None` for an empty message
    pub intent: Option<String>,
    pub notification_failures: Vec<NotificationFailure>,
}

/// Engine generic over its collaborators
pub struct ConversationEngine<St, N, C, I>
where
    St: SessionStore,
    N: NotificationSink,
    C: Clock,
    I: IdGenerator,
{
    store: St,
    sink: N,
    clock: C,
    ids: I,
    extractor: EntityExtractor,
    catalog: RwLock<IntentCatalog>,
    locks: TurnLocks,
    settings: EngineSettings,
}

impl<St, N, C, I> ConversationEngine<St, N, C, I>
where
    St: SessionStore,
    N: NotificationSink,
    C: Clock,
    I: IdGenerator,
{
    pub fn new(store: St, sink: N, clock: C, ids: I) -> Self {
        Self {
            store,
            sink,
            clock,
            ids,
            extractor: EntityExtractor::default(),
            catalog: RwLock::new(default_catalog()),
            locks: TurnLocks::new(),
            settings: EngineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_extractor(mut self, extractor: EntityExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_catalog(mut self, catalog: IntentCatalog) -> Self {
        self.catalog = RwLock::new(catalog);
        self
    }

    /// Register or override one intent definition
    pub fn register_intent(&self, definition: IntentDefinition) {
        tracing::info!(intent = %definition.tag, "Registering intent");
        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(definition);
    }

    /// Catalog tags in classification order
    pub fn intent_tags(&self) -> Vec<String> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|d| d.tag.clone())
            .collect()
    }

    /// Serialized definition for one tag
    pub fn intent(&self, tag: &str) -> Option<IntentEntry> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tag)
            .map(IntentDefinition::to_entry)
    }

    pub async fn session(&self, id: &str) -> Result<Option<Session>, EngineError> {
        self.store.get(id).await.map_err(EngineError::Store)
    }

    /// Abort any flow in progress for `id`; `None` if the session is unknown
    pub async fn reset_session(&self, id: &str) -> Result<Option<Session>, EngineError> {
        let _guard = self.locks.acquire(id).await;
        let session = self.store.reset(id).await.map_err(EngineError::Store)?;
        if session.is_some() {
            tracing::info!(session_id = %id, "Session reset");
        }
        Ok(session)
    }

    /// Process one inbound message
    pub async fn handle_turn(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<TurnOutcome, EngineError> {
        let session_id = session_id.map(str::trim).filter(|id| !id.is_empty());
        let text = message.trim();

        if text.is_empty() {
            return self.handle_empty(session_id).await;
        }

        let id = session_id.map_or_else(|| self.ids.next_id(), str::to_string);
        let guard = self.locks.acquire(&id).await;

        let now = self.clock.now();
        let mut session = self
            .store
            .get_or_create(&id, now)
            .await
            .map_err(EngineError::Store)?;
        session.touch(now);

        let step_before = session.step;
        if step_before.is_none() {
            session.begin_flow();
        }

        let extracted = self.extractor.extract(text);
        let emergency_category = extracted.get(&Field::EmergencyCategory).cloned();
        session.collected.extend(extracted);

        let (result, classification, mut response) = {
            let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
            let classification = classify(&catalog, text, &session);
            let definition = catalog.get(&classification.tag);

            let mut turn = Turn::plain(text);
            turn.intent.clone_from(&classification.tag);
            turn.intent_next_step = definition.and_then(|d| d.next_step);
            turn.intent_terminal = definition.is_some_and(|d| d.terminal);
            turn.emergency_category = emergency_category;

            let ctx = TurnContext {
                session_id: &id,
                now,
                collected: &session.collected,
            };
            let result = transition(step_before, &ctx, &turn);

            session.step = result.next_step;
            match result.lifecycle {
                Lifecycle::Continue | Lifecycle::Started => {}
                Lifecycle::Completed => session.status = SessionStatus::Completed,
                Lifecycle::Reset => session.reset(),
            }
            session.record_intent(&classification.tag, self.settings.history_limit);

            let response = response::render(&catalog, &result.reply, &session);
            (result, classification, response)
        };

        self.store.put(&session).await.map_err(EngineError::Store)?;
        drop(guard);

        let conversation_complete = step_before.is_some() && result.next_step.is_none();
        if classification.is_unknown() {
            tracing::debug!(session_id = %id, score = classification.score, "No intent matched");
        }
        tracing::info!(
            session_id = %id,
            intent = %classification.tag,
            score = classification.score,
            from = ?step_before,
            to = ?result.next_step,
            complete = conversation_complete,
            effects = result.effects.len(),
            "Turn handled"
        );

        let notification_failures = dispatch_effects(
            &self.sink,
            &result.effects,
            self.settings.notify_timeout,
            &id,
        )
        .await;

        if let Some(advisory) = response::advisory(&notification_failures) {
            response.push_str("\n\n");
            response.push_str(advisory);
        }

        Ok(TurnOutcome {
            response,
            session_id: id,
            step: result.next_step,
            conversation_complete,
            intent: Some(classification.tag),
            notification_failures,
        })
    }

    /// Empty input: fixed prompt, no session created or touched
    async fn handle_empty(&self, session_id: Option<&str>) -> Result<TurnOutcome, EngineError> {
        let (id, step) = match session_id {
            Some(id) => {
                let session = self.store.get(id).await.map_err(EngineError::Store)?;
                (id.to_string(), session.and_then(|s| s.step))
            }
            None => (self.ids.next_id(), None),
        };
        tracing::debug!(session_id = %id, "Empty message ignored");

        let response = {
            let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
            response::empty_message(&catalog)
        };

        Ok(TurnOutcome {
            response,
            session_id: id,
            step,
            conversation_complete: false,
            intent: None,
            notification_failures: Vec::new(),
        })
    }
}
