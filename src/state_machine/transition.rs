//! Pure state transition function
//!
//! Transition table (step before -> step after):
//!
//! | Step                        | Trigger                          | Next                 |
//! |-----------------------------|----------------------------------|----------------------|
//! | none                        | any message                      | service confirmation |
//! | service confirmation        | affirmative token                | urgency              |
//! | service confirmation        | otherwise                        | none                 |
//! | urgency                     | "emergency"                      | emergency details    |
//! | urgency                     | "normal" / "routine"             | appointment details  |
//! | urgency                     | intent pointing at a details step| that step            |
//! | urgency                     | otherwise                        | urgency (re-prompt)  |
//! | emergency details           | completeness keyword             | none (+append, alert)|
//! | appointment details         | completeness keyword             | none (+append)       |
//! | details (either)            | no keyword                       | same (re-prompt)     |
//! | symptom details             | any message                      | none                 |
//!
//! A terminal intent ends a flow in progress before the table applies, unless
//! the message already passes the current details step's completeness check.

use super::state::{Lifecycle, Reply, Step, Turn, TurnContext};
use super::Effect;
use super::{TABLE_APPOINTMENTS, TABLE_EMERGENCIES};
use crate::extract::Field;

pub const AFFIRMATIVE_TOKENS: &[&str] = &[
    "yes", "y", "yeah", "yep", "yup", "sure", "ok", "okay", "please", "definitely", "absolutely",
];

pub const EMERGENCY_DETAIL_KEYWORDS: &[&str] = &[
    "location",
    "address",
    "phone",
    "number",
    "emergency",
    "situation",
];

pub const APPOINTMENT_DETAIL_KEYWORDS: &[&str] = &["name", "date", "time", "reason", "appointment"];

/// Placeholder for fields missing from a persisted record
pub const UNKNOWN_FIELD: &str = "Unknown";

pub const ALERT_SUBJECT: &str = "New Emergency Service Request";

/// Result of a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub next_step: Option<Step>,
    pub reply: Reply,
    pub effects: Vec<Effect>,
    pub lifecycle: Lifecycle,
}

impl TransitionResult {
    pub fn new(next_step: Option<Step>, reply: Reply) -> Self {
        Self {
            next_step,
            reply,
            effects: vec![],
            lifecycle: Lifecycle::Continue,
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
pub fn transition(step: Option<Step>, ctx: &TurnContext<'_>, turn: &Turn) -> TransitionResult {
    if step.is_some() && turn.intent_terminal && !completes_details(step, turn) {
        return TransitionResult::new(
            None,
            Reply::FlowEnded {
                tag: turn.intent.clone(),
            },
        )
        .with_lifecycle(Lifecycle::Reset);
    }

    match step {
        None => TransitionResult::new(Some(Step::AwaitingServiceConfirmation), Reply::Greeting)
            .with_lifecycle(Lifecycle::Started),

        Some(Step::AwaitingServiceConfirmation) => {
            if turn.has_token(AFFIRMATIVE_TOKENS) {
                TransitionResult::new(Some(Step::AwaitingUrgency), Reply::UrgencyPrompt)
            } else {
                TransitionResult::new(None, Reply::ServiceDeclined)
                    .with_lifecycle(Lifecycle::Completed)
            }
        }

        Some(Step::AwaitingUrgency) => route_urgency(turn),

        Some(Step::EmergencyDetails) => {
            if completes_details(step, turn) {
                TransitionResult::new(None, Reply::EmergencyRegistered)
                    .with_effect(Effect::append(TABLE_EMERGENCIES, emergency_record(ctx, turn)))
                    .with_effect(Effect::notify(ALERT_SUBJECT, alert_body(ctx, turn)))
                    .with_lifecycle(Lifecycle::Completed)
            } else {
                TransitionResult::new(Some(Step::EmergencyDetails), Reply::EmergencyDetailsReprompt)
            }
        }

        Some(Step::AppointmentDetails) => {
            if completes_details(step, turn) {
                TransitionResult::new(None, Reply::AppointmentBooked)
                    .with_effect(Effect::append(
                        TABLE_APPOINTMENTS,
                        appointment_record(ctx, turn),
                    ))
                    .with_lifecycle(Lifecycle::Completed)
            } else {
                TransitionResult::new(
                    Some(Step::AppointmentDetails),
                    Reply::AppointmentDetailsReprompt,
                )
            }
        }

        Some(Step::SymptomDetails) => TransitionResult::new(
            None,
            Reply::SymptomAdvice {
                category: turn.emergency_category.clone(),
            },
        )
        .with_lifecycle(Lifecycle::Completed),
    }
}

/// Whether `turn` finishes the details step it arrives in
pub fn completes_details(step: Option<Step>, turn: &Turn) -> bool {
    match step {
        Some(Step::EmergencyDetails) => turn.contains_any(EMERGENCY_DETAIL_KEYWORDS),
        Some(Step::AppointmentDetails) => turn.contains_any(APPOINTMENT_DETAIL_KEYWORDS),
        _ => false,
    }
}

fn route_urgency(turn: &Turn) -> TransitionResult {
    let target = if turn.lowered.contains("emergency") {
        Some(Step::EmergencyDetails)
    } else if turn.contains_any(&["normal", "routine"]) {
        Some(Step::AppointmentDetails)
    } else {
        turn.intent_next_step.filter(|s| s.is_details())
    };

    match target {
        Some(Step::EmergencyDetails) => {
            TransitionResult::new(Some(Step::EmergencyDetails), Reply::EmergencyPrompt)
        }
        Some(Step::AppointmentDetails) => {
            TransitionResult::new(Some(Step::AppointmentDetails), Reply::AppointmentPrompt)
        }
        Some(Step::SymptomDetails) => {
            TransitionResult::new(Some(Step::SymptomDetails), Reply::SymptomPrompt)
        }
        _ => TransitionResult::new(Some(Step::AwaitingUrgency), Reply::UrgencyReprompt),
    }
}

fn field_or_unknown(ctx: &TurnContext<'_>, field: Field) -> String {
    ctx.collected
        .get(&field)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_FIELD.to_string())
}

/// `[timestamp, session, name, phone, location, category, message]`
pub fn emergency_record(ctx: &TurnContext<'_>, turn: &Turn) -> Vec<String> {
    vec![
        ctx.now.to_rfc3339(),
        ctx.session_id.to_string(),
        field_or_unknown(ctx, Field::Name),
        field_or_unknown(ctx, Field::Phone),
        field_or_unknown(ctx, Field::Location),
        field_or_unknown(ctx, Field::EmergencyCategory),
        turn.text.clone(),
    ]
}

/// `[timestamp, session, name, phone, date, time, location, message]`
pub fn appointment_record(ctx: &TurnContext<'_>, turn: &Turn) -> Vec<String> {
    vec![
        ctx.now.to_rfc3339(),
        ctx.session_id.to_string(),
        field_or_unknown(ctx, Field::Name),
        field_or_unknown(ctx, Field::Phone),
        field_or_unknown(ctx, Field::Date),
        field_or_unknown(ctx, Field::Time),
        field_or_unknown(ctx, Field::Location),
        turn.text.clone(),
    ]
}

fn alert_body(ctx: &TurnContext<'_>, turn: &Turn) -> String {
    let mut body = format!(
        "Emergency reported at {}\nSession: {}\n",
        ctx.now.to_rfc3339(),
        ctx.session_id
    );
    for field in [
        Field::Name,
        Field::Phone,
        Field::Location,
        Field::EmergencyCategory,
    ] {
        body.push_str(&format!(
            "{}: {}\n",
            field.label(),
            field_or_unknown(ctx, field)
        ));
    }
    body.push_str(&format!("\nMessage:\n{}", turn.text));
    body
}
