//! Service configuration from environment variables

use crate::engine::{EngineSettings, DEFAULT_NOTIFY_TIMEOUT};
use crate::extract::{EntityExtractor, ExtractionRule, Field};
use crate::session::memory::DEFAULT_MAX_SESSIONS;
use crate::session::DEFAULT_HISTORY_LIMIT;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_ALERT_RECIPIENT: &str = "alerts@localhost";

/// Where sessions live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub session_backend: SessionBackend,
    pub max_sessions: usize,
    pub history_limit: usize,
    pub notify_timeout: Duration,
    /// URL receiving alert JSON; alerts are only logged when unset
    pub alert_webhook: Option<String>,
    pub alert_recipient: String,
    /// Extra intent definitions registered over the defaults
    pub catalog_path: Option<PathBuf>,
    /// Pattern overrides from `INTAKE_RULE_<FIELD>`, e.g. `INTAKE_RULE_PHONE`
    pub extraction_rules: Vec<(Field, String)>,
}

impl IntakeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable numbers fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = non_empty("INTAKE_PORT")
            .or_else(|| non_empty("PORT"))
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let db_path = non_empty("INTAKE_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.care-intake/intake.db"))
            },
            PathBuf::from,
        );

        let session_backend = match non_empty("INTAKE_SESSION_STORE").as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("sqlite") => SessionBackend::Sqlite,
            Some(v) if !v.eq_ignore_ascii_case("memory") => {
                tracing::warn!(value = %v, "Unknown INTAKE_SESSION_STORE, using memory");
                SessionBackend::Memory
            }
            _ => SessionBackend::Memory,
        };

        let parse_usize = |key: &str, default: usize| {
            non_empty(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default)
        };

        let notify_timeout = non_empty("INTAKE_NOTIFY_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map_or(DEFAULT_NOTIFY_TIMEOUT, Duration::from_millis);

        Self {
            port,
            db_path,
            session_backend,
            max_sessions: parse_usize("INTAKE_MAX_SESSIONS", DEFAULT_MAX_SESSIONS),
            history_limit: parse_usize("INTAKE_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT),
            notify_timeout,
            alert_webhook: non_empty("INTAKE_ALERT_WEBHOOK"),
            alert_recipient: non_empty("INTAKE_ALERT_RECIPIENT")
                .unwrap_or_else(|| DEFAULT_ALERT_RECIPIENT.to_string()),
            catalog_path: non_empty("INTAKE_CATALOG_PATH").map(PathBuf::from),
            extraction_rules: Field::ALL
                .into_iter()
                .filter(|f| *f != Field::EmergencyCategory)
                .filter_map(|f| {
                    let key = format!("INTAKE_RULE_{}", f.as_str().to_uppercase());
                    non_empty(key.as_str()).map(|pattern| (f, pattern))
                })
                .collect(),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            history_limit: self.history_limit,
            notify_timeout: self.notify_timeout,
        }
    }

    /// Default extractor with any configured pattern overrides applied
    pub fn extractor(&self) -> EntityExtractor {
        self.extraction_rules
            .iter()
            .fold(EntityExtractor::default(), |extractor, (field, pattern)| {
                extractor.with_rule(ExtractionRule::new(*field, pattern))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> IntakeConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        IntakeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[("HOME", "/home/nurse")]);
        assert_eq!(c.port, 5000);
        assert_eq!(c.db_path, PathBuf::from("/home/nurse/.care-intake/intake.db"));
        assert_eq!(c.session_backend, SessionBackend::Memory);
        assert_eq!(c.max_sessions, 10_000);
        assert_eq!(c.history_limit, 10);
        assert_eq!(c.notify_timeout, Duration::from_secs(5));
        assert!(c.alert_webhook.is_none());
        assert_eq!(c.alert_recipient, "alerts@localhost");
        assert!(c.catalog_path.is_none());
        assert!(c.extraction_rules.is_empty());
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("INTAKE_PORT", "8080"),
            ("INTAKE_DB_PATH", "/var/lib/intake.db"),
            ("INTAKE_SESSION_STORE", "SQLite"),
            ("INTAKE_MAX_SESSIONS", "50"),
            ("INTAKE_HISTORY_LIMIT", "4"),
            ("INTAKE_NOTIFY_TIMEOUT_MS", "250"),
            ("INTAKE_ALERT_WEBHOOK", "https://hooks.example.com/alerts"),
            ("INTAKE_ALERT_RECIPIENT", "oncall@clinic.example"),
            ("INTAKE_CATALOG_PATH", "/etc/intake/intents.json"),
        ]);
        assert_eq!(c.port, 8080);
        assert_eq!(c.db_path, PathBuf::from("/var/lib/intake.db"));
        assert_eq!(c.session_backend, SessionBackend::Sqlite);
        assert_eq!(c.max_sessions, 50);
        assert_eq!(c.engine_settings().history_limit, 4);
        assert_eq!(c.engine_settings().notify_timeout, Duration::from_millis(250));
        assert_eq!(
            c.alert_webhook.as_deref(),
            Some("https://hooks.example.com/alerts")
        );
        assert_eq!(c.alert_recipient, "oncall@clinic.example");
        assert!(c.catalog_path.is_some());
    }

    #[test]
    fn test_port_fallback_and_bad_numbers() {
        let c = config(&[("PORT", "9000"), ("INTAKE_MAX_SESSIONS", "lots")]);
        assert_eq!(c.port, 9000);
        assert_eq!(c.max_sessions, 10_000);

        let c = config(&[("INTAKE_PORT", "not-a-port"), ("INTAKE_NOTIFY_TIMEOUT_MS", "0")]);
        assert_eq!(c.port, 5000);
        assert_eq!(c.notify_timeout, DEFAULT_NOTIFY_TIMEOUT);
    }

    #[test]
    fn test_extraction_rule_overrides() {
        let c = config(&[
            ("INTAKE_RULE_NAME", r"call me (\w+)"),
            ("INTAKE_RULE_EMERGENCY_CATEGORY", "(ignored)"),
        ]);
        assert_eq!(c.extraction_rules.len(), 1);

        let extractor = c.extractor();
        let entities = extractor.extract("hello, call me Dana");
        assert_eq!(entities.get(&Field::Name).map(String::as_str), Some("Dana"));
        assert_eq!(
            extractor.rules().iter().filter(|r| r.field() == Field::Name).count(),
            1
        );
    }
}
