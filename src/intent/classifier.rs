//! Greedy keyword scorer
//!
//! Score per intent:
//! - 1.0 for each trigger pattern that matches the lower-cased utterance
//! - +0.5 for each of those whose match is longer than 5 characters
//! - +0.3 if the tag is among the session's last 3 intents
//! - +2.0 if the session's current step is one of the intent's context steps
//!
//! The session bonuses apply whether or not a pattern matched. The highest
//! score wins, ties go to the earliest catalog entry, and a best score below
//! [`UNKNOWN_THRESHOLD`] yields `unknown`.

use super::{tags, IntentCatalog, IntentDefinition};
use crate::session::Session;

pub const UNKNOWN_THRESHOLD: f64 = 0.5;

const MATCH_SCORE: f64 = 1.0;
const LONG_MATCH_BONUS: f64 = 0.5;
const LONG_MATCH_CHARS: usize = 5;
const HISTORY_BONUS: f64 = 0.3;
const HISTORY_WINDOW: usize = 3;
const CONTEXT_BONUS: f64 = 2.0;

/// Outcome of classifying one utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub tag: String,
    pub score: f64,
}

impl Classification {
    pub fn unknown(score: f64) -> Self {
        Self {
            tag: tags::UNKNOWN.to_string(),
            score,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.tag == tags::UNKNOWN
    }
}

/// Classify `utterance` against every catalog entry. Holds no state between calls.
pub fn classify(catalog: &IntentCatalog, utterance: &str, session: &Session) -> Classification {
    let lowered = utterance.to_lowercase();

    let mut best: Option<(&IntentDefinition, f64)> = None;
    for definition in catalog.iter() {
        let score = score_intent(definition, &lowered, session);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((definition, score));
        }
    }

    match best {
        Some((definition, score)) if score >= UNKNOWN_THRESHOLD => Classification {
            tag: definition.tag.clone(),
            score,
        },
        Some((_, score)) => Classification::unknown(score),
        None => Classification::unknown(0.0),
    }
}

fn score_intent(definition: &IntentDefinition, lowered: &str, session: &Session) -> f64 {
    let mut score = 0.0;

    for pattern in &definition.patterns {
        if let Some(len) = pattern.matched_len(lowered) {
            score += MATCH_SCORE;
            if len > LONG_MATCH_CHARS {
                score += LONG_MATCH_BONUS;
            }
        }
    }

    if session
        .intent_history
        .iter()
        .rev()
        .take(HISTORY_WINDOW)
        .any(|tag| *tag == definition.tag)
    {
        score += HISTORY_BONUS;
    }

    if session
        .step
        .is_some_and(|step| definition.context_steps.contains(&step))
    {
        score += CONTEXT_BONUS;
    }

    score
}
