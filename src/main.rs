//! Care Intake - rule-based medical intake chat service
//!
//! Classifies free-text messages, extracts contact details and walks each
//! session through a small intake state machine, recording emergencies and
//! appointments as flows complete.

mod api;
mod config;
mod db;
mod engine;
mod extract;
mod intent;
mod session;
mod state_machine;

use api::{create_router, AppState, SharedEngine};
use config::{IntakeConfig, SessionBackend};
use db::Database;
use engine::{
    Clock, ConversationEngine, DatabaseSink, IdGenerator, LoggingSink, NotificationSink,
    SystemClock, UuidGenerator,
};
use intent::{default_catalog, IntentCatalog};
use session::{InMemorySessionStore, SessionStore, SqliteSessionStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "care_intake=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = IntakeConfig::from_env();

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    let store: Arc<dyn SessionStore> = match config.session_backend {
        SessionBackend::Memory => Arc::new(InMemorySessionStore::new(config.max_sessions)),
        SessionBackend::Sqlite => {
            tracing::info!(sessions = db.count_sessions()?, "Using SQLite session store");
            Arc::new(SqliteSessionStore::new(db.clone()))
        }
    };

    if config.alert_webhook.is_none() {
        tracing::warn!("INTAKE_ALERT_WEBHOOK not set, emergency alerts will only be logged");
    }
    let sink: Arc<dyn NotificationSink> = Arc::new(LoggingSink::new(DatabaseSink::new(
        db.clone(),
        config.alert_webhook.clone(),
        config.alert_recipient.clone(),
    )));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdGenerator> = Arc::new(UuidGenerator);

    let catalog = load_catalog(&config)?;
    tracing::info!(
        intents = catalog.len(),
        sessions = ?config.session_backend,
        "Intent catalog loaded"
    );

    let extractor = config.extractor();
    for rule in extractor.rules().iter().filter(|r| !r.is_active()) {
        tracing::warn!(field = %rule.field(), "Extraction rule disabled, field will not be collected");
    }

    let engine: SharedEngine = ConversationEngine::new(store, sink, clock, ids)
        .with_extractor(extractor)
        .with_catalog(catalog)
        .with_settings(config.engine_settings());
    let state = AppState::new(engine, db);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Care intake server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Default catalog, overridden by the optional catalog file
fn load_catalog(config: &IntakeConfig) -> Result<IntentCatalog, intent::CatalogError> {
    let mut catalog = default_catalog();
    if let Some(path) = &config.catalog_path {
        let count = catalog.load_file(path)?;
        tracing::info!(path = %path.display(), count, "Registered intents from catalog file");
    }
    Ok(catalog)
}
