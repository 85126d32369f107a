//! Intake state types

use crate::extract::Entities;
use crate::intent::tags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in the intake flow. A session between flows has no step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Greeting sent, waiting for "do you need a service?" answer
    AwaitingServiceConfirmation,
    /// Waiting for emergency vs. normal
    AwaitingUrgency,
    EmergencyDetails,
    AppointmentDetails,
    SymptomDetails,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::AwaitingServiceConfirmation,
        Step::AwaitingUrgency,
        Step::EmergencyDetails,
        Step::AppointmentDetails,
        Step::SymptomDetails,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Step::AwaitingServiceConfirmation => "awaiting_service_confirmation",
            Step::AwaitingUrgency => "awaiting_urgency",
            Step::EmergencyDetails => "emergency_details",
            Step::AppointmentDetails => "appointment_details",
            Step::SymptomDetails => "symptom_details",
        }
    }

    /// Steps that collect a block of free-text details
    pub fn is_details(self) -> bool {
        matches!(
            self,
            Step::EmergencyDetails | Step::AppointmentDetails | Step::SymptomDetails
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user is told after a transition.
///
/// Each variant names the catalog entry whose templates render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Greeting,
    UrgencyPrompt,
    ServiceDeclined,
    UrgencyReprompt,
    EmergencyPrompt,
    AppointmentPrompt,
    SymptomPrompt,
    EmergencyDetailsReprompt,
    AppointmentDetailsReprompt,
    EmergencyRegistered,
    AppointmentBooked,
    SymptomAdvice { category: Option<String> },
    /// A terminal intent ended the flow; rendered with that intent's templates
    FlowEnded { tag: String },
}

impl Reply {
    pub fn template_tag(&self) -> &str {
        match self {
            Reply::Greeting => tags::GREETING,
            Reply::UrgencyPrompt => tags::URGENCY_PROMPT,
            Reply::ServiceDeclined => tags::SERVICE_DECLINED,
            Reply::UrgencyReprompt => tags::URGENCY_REPROMPT,
            Reply::EmergencyPrompt => tags::EMERGENCY,
            Reply::AppointmentPrompt => tags::APPOINTMENT,
            Reply::SymptomPrompt => tags::SYMPTOM,
            Reply::EmergencyDetailsReprompt => tags::EMERGENCY_DETAILS_REPROMPT,
            Reply::AppointmentDetailsReprompt => tags::APPOINTMENT_DETAILS_REPROMPT,
            Reply::EmergencyRegistered => tags::EMERGENCY_REGISTERED,
            Reply::AppointmentBooked => tags::APPOINTMENT_BOOKED,
            Reply::SymptomAdvice { .. } => tags::SYMPTOM_ADVICE,
            Reply::FlowEnded { tag } => tag,
        }
    }

    /// Replies that get the bulleted summary of known contact fields
    pub fn confirms_details(&self) -> bool {
        matches!(
            self,
            Reply::EmergencyPrompt
                | Reply::AppointmentPrompt
                | Reply::EmergencyDetailsReprompt
                | Reply::AppointmentDetailsReprompt
                | Reply::EmergencyRegistered
                | Reply::AppointmentBooked
        )
    }
}

/// Effect of a transition on the session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Flow continues (or stays idle)
    Continue,
    /// A new flow began; previously collected data is discarded
    Started,
    /// Flow finished normally (completion or decline)
    Completed,
    /// Flow aborted by a terminal intent
    Reset,
}

/// Session-scoped inputs to a transition
#[derive(Debug, Clone)]
pub struct TurnContext<'a> {
    pub session_id: &'a str,
    pub now: DateTime<Utc>,
    /// Collected data including the fields extracted this turn
    pub collected: &'a Entities,
}

/// One classified inbound message
#[derive(Debug, Clone)]
pub struct Turn {
    /// Trimmed original text
    pub text: String,
    pub lowered: String,
    pub intent: String,
    /// Step the classified intent points at, if any
    pub intent_next_step: Option<Step>,
    pub intent_terminal: bool,
    pub emergency_category: Option<String>,
}

impl Turn {
    /// Build a turn without intent information (useful for pure step checks)
    pub fn plain(text: &str) -> Self {
        let text = text.trim().to_string();
        Self {
            lowered: text.to_lowercase(),
            text,
            intent: tags::UNKNOWN.to_string(),
            intent_next_step: None,
            intent_terminal: false,
            emergency_category: None,
        }
    }

    pub fn contains_any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.lowered.contains(k))
    }

    pub fn has_token(&self, tokens: &[&str]) -> bool {
        self.lowered
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| tokens.contains(&word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_serialization() {
        let json = serde_json::to_string(&Step::AwaitingServiceConfirmation).unwrap();
        assert_eq!(json, "\"awaiting_service_confirmation\"");
        for step in Step::ALL {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{}\"", step.as_str()));
            let back: Step = serde_json::from_str(&json).unwrap();
            assert_eq!(back, step);
        }
    }

    #[test]
    fn test_has_token_matches_whole_words() {
        let turn = Turn::plain("Yes, please!");
        assert!(turn.has_token(&["yes"]));
        assert!(!Turn::plain("yesterday").has_token(&["yes"]));
    }

    #[test]
    fn test_flow_ended_uses_intent_tag() {
        let reply = Reply::FlowEnded {
            tag: "goodbye".to_string(),
        };
        assert_eq!(reply.template_tag(), "goodbye");
        assert!(!reply.confirms_details());
        assert!(Reply::EmergencyRegistered.confirms_details());
    }
}
