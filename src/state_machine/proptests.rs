//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::extract::{Entities, Field};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_step() -> impl Strategy<Value = Option<Step>> {
    prop_oneof![
        Just(None),
        Just(Some(Step::AwaitingServiceConfirmation)),
        Just(Some(Step::AwaitingUrgency)),
        Just(Some(Step::EmergencyDetails)),
        Just(Some(Step::AppointmentDetails)),
        Just(Some(Step::SymptomDetails)),
    ]
}

fn arb_word() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}",
        Just("yes".to_string()),
        Just("no".to_string()),
        Just("emergency".to_string()),
        Just("normal".to_string()),
        Just("address".to_string()),
        Just("date".to_string()),
        Just("name".to_string()),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(arb_word(), 1..6).prop_map(|w| w.join(" "))
}

fn arb_turn() -> impl Strategy<Value = Turn> {
    (
        arb_text(),
        any::<bool>(),
        prop_oneof![
            Just(None),
            Just(Some(Step::EmergencyDetails)),
            Just(Some(Step::AppointmentDetails)),
            Just(Some(Step::SymptomDetails)),
            Just(Some(Step::AwaitingServiceConfirmation)),
        ],
    )
        .prop_map(|(text, terminal, next)| {
            let mut turn = Turn::plain(&text);
            turn.intent = if terminal { "goodbye" } else { "other" }.to_string();
            turn.intent_terminal = terminal;
            turn.intent_next_step = next;
            turn
        })
}

fn arb_collected() -> impl Strategy<Value = Entities> {
    (
        proptest::option::of("[A-Z][a-z]{2,8}"),
        proptest::option::of("[0-9]{3}-[0-9]{4}"),
        proptest::option::of("[0-9]{1,3} [A-Z][a-z]{3,8} St"),
    )
        .prop_map(|(name, phone, location)| {
            let mut data = Entities::new();
            if let Some(v) = name {
                data.insert(Field::Name, v);
            }
            if let Some(v) = phone {
                data.insert(Field::Phone, v);
            }
            if let Some(v) = location {
                data.insert(Field::Location, v);
            }
            data
        })
}

fn run(step: Option<Step>, collected: &Entities, turn: &Turn) -> TransitionResult {
    let ctx = TurnContext {
        session_id: "prop-session",
        now: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        collected,
    };
    transition(step, &ctx, turn)
}

// ============================================================================
// Invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: transition is deterministic
    #[test]
    fn prop_transition_is_pure(step in arb_step(), collected in arb_collected(), turn in arb_turn()) {
        prop_assert_eq!(run(step, &collected, &turn), run(step, &collected, &turn));
    }

    // Invariant 2: idle always moves to service confirmation with no effects
    #[test]
    fn prop_idle_always_greets(collected in arb_collected(), turn in arb_turn()) {
        let r = run(None, &collected, &turn);
        prop_assert_eq!(r.next_step, Some(Step::AwaitingServiceConfirmation));
        prop_assert!(r.effects.is_empty());
        prop_assert_eq!(r.lifecycle, Lifecycle::Started);
    }

    // Invariant 3: effects only occur when a details step completes
    #[test]
    fn prop_effects_only_on_completion(step in arb_step(), collected in arb_collected(), turn in arb_turn()) {
        let r = run(step, &collected, &turn);
        if !r.effects.is_empty() {
            prop_assert!(matches!(step, Some(Step::EmergencyDetails | Step::AppointmentDetails)));
            prop_assert_eq!(r.next_step, None);
            prop_assert_eq!(r.lifecycle, Lifecycle::Completed);
        }
    }

    // Invariant 4: emergency completion always appends and alerts exactly once
    #[test]
    fn prop_emergency_completion_shape(collected in arb_collected(), turn in arb_turn()) {
        let r = run(Some(Step::EmergencyDetails), &collected, &turn);
        if r.next_step.is_none() && r.lifecycle == Lifecycle::Completed {
            let appends = r.effects.iter().filter(|e| matches!(e, Effect::AppendRecord { table, .. } if table == TABLE_EMERGENCIES)).count();
            let alerts = r.effects.iter().filter(|e| matches!(e, Effect::Notify { .. })).count();
            prop_assert_eq!(appends, 1);
            prop_assert_eq!(alerts, 1);
        }
    }

    // Invariant 5: records never carry empty fields
    #[test]
    fn prop_records_use_placeholder(step in arb_step(), collected in arb_collected(), turn in arb_turn()) {
        for effect in run(step, &collected, &turn).effects {
            if let Effect::AppendRecord { fields, .. } = effect {
                prop_assert!(fields.iter().all(|f| !f.is_empty()));
            }
        }
    }

    // Invariant 6: a terminal intent leaves the flow without effects, unless
    // the message completes the current details step
    #[test]
    fn prop_terminal_intent_resets(step in arb_step(), collected in arb_collected(), text in arb_text()) {
        prop_assume!(step.is_some());
        let mut turn = Turn::plain(&text);
        turn.intent = "goodbye".to_string();
        turn.intent_terminal = true;
        let r = run(step, &collected, &turn);
        prop_assert_eq!(r.next_step, None);
        if completes_details(step, &turn) {
            prop_assert_eq!(r.lifecycle, Lifecycle::Completed);
            prop_assert!(!r.effects.is_empty());
        } else {
            prop_assert_eq!(r.lifecycle, Lifecycle::Reset);
            prop_assert!(r.effects.is_empty());
        }
    }

    // Invariant 7: the symptom step always ends the flow
    #[test]
    fn prop_symptom_step_ends(collected in arb_collected(), mut turn in arb_turn()) {
        turn.intent_terminal = false;
        let r = run(Some(Step::SymptomDetails), &collected, &turn);
        prop_assert_eq!(r.next_step, None);
        prop_assert!(r.effects.is_empty());
    }

    // Invariant 8: leaving a flow is always reported through the lifecycle
    #[test]
    fn prop_flow_exit_has_lifecycle(step in arb_step(), collected in arb_collected(), turn in arb_turn()) {
        let r = run(step, &collected, &turn);
        if step.is_some() && r.next_step.is_none() {
            prop_assert!(matches!(r.lifecycle, Lifecycle::Completed | Lifecycle::Reset));
        } else {
            prop_assert!(!matches!(r.lifecycle, Lifecycle::Completed | Lifecycle::Reset));
        }
    }
}
