//! Built-in intent catalog
//!
//! Order matters: classification ties go to the entry registered first.
//!
//! The context bonus is added even when no pattern matches, so context steps
//! are only declared where an unmatched win is harmless. Flow steps route on
//! keywords, and a bonus there would outweigh `goodbye`.

use super::{IntentCatalog, IntentDefinition};
use crate::state_machine::Step;

/// Tags of the built-in catalog entries
pub mod tags {
    pub const UNKNOWN: &str = "unknown";

    // Classifiable intents
    pub const EMERGENCY: &str = "emergency";
    pub const APPOINTMENT: &str = "appointment";
    pub const SYMPTOM: &str = "symptom";
    pub const AFFIRM: &str = "affirm";
    pub const DENY: &str = "deny";
    pub const GREETING: &str = "greeting";
    pub const THANKS: &str = "thanks";
    pub const GOODBYE: &str = "goodbye";

    // Response-only entries
    pub const URGENCY_PROMPT: &str = "urgency_prompt";
    pub const SERVICE_DECLINED: &str = "service_declined";
    pub const URGENCY_REPROMPT: &str = "urgency_reprompt";
    pub const EMERGENCY_DETAILS_REPROMPT: &str = "emergency_details_reprompt";
    pub const APPOINTMENT_DETAILS_REPROMPT: &str = "appointment_details_reprompt";
    pub const EMERGENCY_REGISTERED: &str = "emergency_registered";
    pub const APPOINTMENT_BOOKED: &str = "appointment_booked";
    pub const SYMPTOM_ADVICE: &str = "symptom_advice";
    pub const EMPTY_MESSAGE: &str = "empty_message";
}

/// Build the default catalog
pub fn default_catalog() -> IntentCatalog {
    let mut catalog = IntentCatalog::new();
    for definition in default_definitions() {
        catalog.register(definition);
    }
    catalog
}

#[allow(clippy::too_many_lines)]
fn default_definitions() -> Vec<IntentDefinition> {
    vec![
        IntentDefinition::new(tags::EMERGENCY)
            .with_literals(&[
                "emergency",
                "urgent",
                "ambulance",
                "chest pain",
                "heart attack",
                "bleeding",
                "accident",
                "unconscious",
                "can't breathe",
                "seizure",
            ])
            .with_next_step(Step::EmergencyDetails)
            .with_responses(&[
                "🚨 Emergency detected! Please share:\n• Full Name\n• Address / Location\n• Contact Number\n• What is the situation?",
                "🚨 Help is being arranged. Tell us in one message:\n• Full Name\n• Address / Location\n• Contact Number\n• What is happening?",
            ]),
        IntentDefinition::new(tags::APPOINTMENT)
            .with_literals(&[
                "appointment",
                "normal",
                "routine",
                "book",
                "schedule",
                "checkup",
                "check-up",
                "visit",
            ])
            .with_next_step(Step::AppointmentDetails)
            .with_responses(&[
                "📝 Please provide:\n• Full Name\n• Address\n• Preferred Date and Time\n• Reason for the appointment",
                "📝 Let's book it. Please send:\n• Full Name\n• Address\n• Preferred Date and Time\n• Reason for the visit",
            ]),
        IntentDefinition::new(tags::SYMPTOM)
            .with_literals(&[
                "symptom", "fever", "headache", "cough", "pain", "nausea", "dizzy", "advice",
            ])
            .with_next_step(Step::SymptomDetails)
            .with_responses(&[
                "🩺 Please describe your symptoms: what you feel, since when, and how severe it is.",
            ]),
        IntentDefinition::new(tags::AFFIRM)
            .with_words(&["yes", "yeah", "yep", "sure", "ok", "okay"])
            .with_context_steps(&[Step::AwaitingServiceConfirmation])
            .with_responses(&["👍 Great."]),
        IntentDefinition::new(tags::DENY)
            .with_words(&["no", "nope", "not now"])
            .with_context_steps(&[Step::AwaitingServiceConfirmation])
            .with_responses(&["😊 Alright."]),
        IntentDefinition::new(tags::GREETING)
            .with_literals(&["hello", "good morning", "good afternoon", "good evening", "salam"])
            .with_words(&["hi", "hey"])
            .with_next_step(Step::AwaitingServiceConfirmation)
            .with_responses(&[
                "👋 Welcome! Do you need any service today? (yes / no)",
                "👋 Hello {name}! Do you need any medical service today? (yes / no)",
            ]),
        IntentDefinition::new(tags::THANKS)
            .with_literals(&["thank", "appreciate"])
            .with_responses(&["😊 You're welcome!"]),
        IntentDefinition::new(tags::GOODBYE)
            .with_literals(&["goodbye", "cancel", "never mind", "nevermind", "start over"])
            .with_words(&["bye", "stop"])
            .terminal()
            .with_responses(&[
                "👋 No problem, I've cancelled that. Message us anytime.",
                "👋 Okay, stopping here. Message us anytime you need help.",
            ]),
        IntentDefinition::responses_only(tags::URGENCY_PROMPT, &["⚠️ Is it emergency or normal?"]),
        IntentDefinition::responses_only(
            tags::SERVICE_DECLINED,
            &["😊 Alright! Message us anytime."],
        ),
        IntentDefinition::responses_only(
            tags::URGENCY_REPROMPT,
            &[
                "❗ Please type: emergency OR normal",
                "❗ Sorry, I didn't catch that. Is it an emergency, or a normal appointment?",
            ],
        ),
        IntentDefinition::responses_only(
            tags::EMERGENCY_DETAILS_REPROMPT,
            &["🚨 Please send your name, location / address and contact number in one message."],
        ),
        IntentDefinition::responses_only(
            tags::APPOINTMENT_DETAILS_REPROMPT,
            &["📝 Please send your name, preferred date and time, and the reason for the appointment."],
        ),
        IntentDefinition::responses_only(
            tags::EMERGENCY_REGISTERED,
            &["🚑 Emergency registered! Our team is on the way. Stay safe."],
        ),
        IntentDefinition::responses_only(
            tags::APPOINTMENT_BOOKED,
            &["📅 Your appointment is booked! Our team will visit at the chosen time."],
        ),
        IntentDefinition::responses_only(
            tags::SYMPTOM_ADVICE,
            &[
                "🩺 Thanks for the details. Rest, stay hydrated and book a normal appointment if it does not improve.",
                "🩺 Noted. Keep an eye on it and reach out for a normal appointment if it gets worse.",
            ],
        ),
        // No reply renders `unknown` directly: it is the text for any reply
        // tag without templates. Unrecognized messages inside a flow get the
        // step's re-prompt instead.
        IntentDefinition::responses_only(
            tags::UNKNOWN,
            &["🤔 Sorry, I didn't understand. Could you rephrase?"],
        ),
        IntentDefinition::responses_only(
            tags::EMPTY_MESSAGE,
            &["Please type a message so I can help you."],
        ),
    ]
}
