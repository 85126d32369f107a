//! API request and response types

use crate::engine::{NotificationFailure, TurnOutcome};
use crate::state_machine::Step;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One inbound turn. A missing or non-string `message` counts as empty.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub session_id: Option<String>,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_optional_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub step: Option<Step>,
    pub conversation_complete: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notification_failures: Vec<NotificationFailure>,
}

impl From<TurnOutcome> for ChatResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            response: outcome.response,
            session_id: outcome.session_id,
            step: outcome.step,
            conversation_complete: outcome.conversation_complete,
            notification_failures: outcome.notification_failures,
        }
    }
}

/// Catalog tags in classification order
#[derive(Debug, Serialize)]
pub struct IntentsResponse {
    pub intents: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterIntentResponse {
    pub tag: String,
    pub total: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_is_lenient() {
        let req: ChatRequest = serde_json::from_str(r#"{"message": 42, "session_id": null}"#).unwrap();
        assert_eq!(req.message, "");
        assert!(req.session_id.is_none());

        let req: ChatRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.message, "");

        let req: ChatRequest =
            serde_json::from_str(r#"{"message": "hi", "session_id": "abc"}"#).unwrap();
        assert_eq!(req.message, "hi");
        assert_eq!(req.session_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_chat_response_shape() {
        let json = serde_json::to_value(ChatResponse {
            response: "ok".to_string(),
            session_id: "s".to_string(),
            step: None,
            conversation_complete: true,
            notification_failures: vec![],
        })
        .unwrap();
        assert_eq!(json["step"], Value::Null);
        assert_eq!(json["conversation_complete"], true);
        assert!(json.get("notification_failures").is_none());
    }
}
