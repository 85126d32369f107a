//! HTTP API for the intake service

mod assets;
mod handlers;
mod types;

pub use handlers::create_router;

use crate::db::Database;
use crate::engine::{Clock, ConversationEngine, IdGenerator, NotificationSink};
use crate::session::SessionStore;
use std::sync::Arc;

/// Engine with its collaborators behind trait objects
pub type SharedEngine = ConversationEngine<
    Arc<dyn SessionStore>,
    Arc<dyn NotificationSink>,
    Arc<dyn Clock>,
    Arc<dyn IdGenerator>,
>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SharedEngine>,
    /// Appended intake records, read back by staff endpoints
    pub db: Database,
}

impl AppState {
    pub fn new(engine: SharedEngine, db: Database) -> Self {
        Self {
            engine: Arc::new(engine),
            db,
        }
    }
}
