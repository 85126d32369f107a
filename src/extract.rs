//! Entity extraction from free-text utterances
//!
//! Each field of the vocabulary has at most one regex rule with exactly one
//! capture group. Extraction is pure: the same utterance always yields the
//! same fields, and a field that does not match is simply absent.

#[cfg(test)]
mod proptests;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Fixed field vocabulary for collected session data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Phone,
    Email,
    Location,
    Date,
    Time,
    Symptom,
    EmergencyCategory,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Name,
        Field::Phone,
        Field::Email,
        Field::Location,
        Field::Date,
        Field::Time,
        Field::Symptom,
        Field::EmergencyCategory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Phone => "phone",
            Field::Email => "email",
            Field::Location => "location",
            Field::Date => "date",
            Field::Time => "time",
            Field::Symptom => "symptom",
            Field::EmergencyCategory => "emergency_category",
        }
    }

    /// Human-readable label used in confirmations and alert bodies
    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Phone => "Phone",
            Field::Email => "Email",
            Field::Location => "Location",
            Field::Date => "Date",
            Field::Time => "Time",
            Field::Symptom => "Symptom",
            Field::EmergencyCategory => "Category",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields lifted from one utterance, ordered by field
pub type Entities = BTreeMap<Field, String>;

/// A single-capture-group pattern bound to one field
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    field: Field,
    /// `None` when the pattern failed to compile; such a rule never matches
    pattern: Option<Regex>,
}

impl ExtractionRule {
    /// Compile a rule. Patterns are always matched case-insensitively.
    ///
    /// A pattern that does not compile, or that does not have exactly one
    /// capture group, produces an inert rule instead of an error.
    pub fn new(field: Field, source: &str) -> Self {
        let pattern = match RegexBuilder::new(source).case_insensitive(true).build() {
            // captures_len counts the implicit whole-match group
            Ok(re) if re.captures_len() == 2 => Some(re),
            Ok(re) => {
                tracing::warn!(
                    field = %field,
                    groups = re.captures_len() - 1,
                    "Extraction rule must have exactly one capture group; rule disabled"
                );
                None
            }
            Err(e) => {
                tracing::warn!(field = %field, error = %e, "Invalid extraction pattern; rule disabled");
                None
            }
        };
        Self { field, pattern }
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn is_active(&self) -> bool {
        self.pattern.is_some()
    }

    /// First match wins; the capture is trimmed and dropped if empty
    fn apply<'a>(&self, utterance: &'a str) -> Option<&'a str> {
        let caps = self.pattern.as_ref()?.captures(utterance)?;
        let value = caps.get(1)?.as_str().trim();
        (!value.is_empty()).then_some(value)
    }
}

/// Keyword -> emergency category, in priority order
pub const EMERGENCY_KEYWORDS: &[(&str, &str)] = &[
    ("chest pain", "cardiac"),
    ("heart attack", "cardiac"),
    ("cardiac", "cardiac"),
    ("can't breathe", "respiratory"),
    ("cannot breathe", "respiratory"),
    ("breathing", "respiratory"),
    ("choking", "respiratory"),
    ("unconscious", "neurological"),
    ("seizure", "neurological"),
    ("stroke", "neurological"),
    ("bleeding", "trauma"),
    ("accident", "trauma"),
    ("fracture", "trauma"),
    ("broken", "trauma"),
    ("burn", "burns"),
    ("overdose", "poisoning"),
    ("poison", "poisoning"),
    ("allergic", "allergic_reaction"),
    ("labor", "obstetric"),
    ("pregnan", "obstetric"),
];

/// Words that end a captured name: "my name is Bob and I need help" is Bob
const NAME_STOP_WORDS: &[&str] = &[
    "and", "or", "but", "so", "i", "i'm", "im", "from", "at", "with", "need", "want", "here",
    "calling", "please", "my", "the", "a", "to", "for", "is", "am",
];

/// Keep the leading words of a name capture up to the first stop word
fn trim_name(value: &str) -> Option<&str> {
    let mut end = 0;
    for word in value.split_whitespace() {
        if NAME_STOP_WORDS.contains(&word.to_lowercase().as_str()) {
            break;
        }
        end += value.get(end..)?.find(word)? + word.len();
    }
    value.get(..end).filter(|name| !name.is_empty())
}

/// Default rules, compiled once
static DEFAULT_RULES: Lazy<Vec<ExtractionRule>> = Lazy::new(|| {
    vec![
        ExtractionRule::new(
            Field::Name,
            r"(?:my name is|name\s*(?:is|:|-))\s*([a-z][a-z'\-]*(?:[ \t]+[a-z][a-z'\-]*){0,2})",
        ),
        ExtractionRule::new(
            Field::Phone,
            r"(?:phone|number|contact|mobile|tel|call me at)\s*(?:is|:|-)?\s*(\+?\d[\d\- ().]{4,}\d)",
        ),
        ExtractionRule::new(Field::Email, r"([\w.+\-]+@[\w\-]+(?:\.[\w\-]+)+)"),
        ExtractionRule::new(
            Field::Location,
            r"(?:location|address|located at|i am at|i'm at)\s*(?:is|:|-)?\s*([^,;\n]+)",
        ),
        ExtractionRule::new(
            Field::Date,
            r"(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{2,4}|\btoday\b|\btomorrow\b|\b(?:mon|tues|wednes|thurs|fri|satur|sun)day\b)",
        ),
        ExtractionRule::new(
            Field::Time,
            r"(\b\d{1,2}(?::\d{2})?\s*(?:am|pm)\b|\b\d{1,2}:\d{2}\b|\bmorning\b|\bafternoon\b|\bevening\b)",
        ),
        ExtractionRule::new(
            Field::Symptom,
            r"(?:symptoms?|suffering from|feeling|i have)\s*(?:is|are|:|-)?\s*([^,.;\n]+)",
        ),
    ]
});

/// Regex-driven field extractor
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    rules: Vec<ExtractionRule>,
    keywords: Vec<(String, String)>,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        let rules = DEFAULT_RULES.clone();
        let keywords = EMERGENCY_KEYWORDS
            .iter()
            .map(|(k, c)| ((*k).to_string(), (*c).to_string()))
            .collect();
        Self { rules, keywords }
    }
}

impl EntityExtractor {
    /// Replace the rule for `rule.field()`, or add it if the field had none
    pub fn with_rule(mut self, rule: ExtractionRule) -> Self {
        if let Some(slot) = self.rules.iter_mut().find(|r| r.field == rule.field) {
            *slot = rule;
        } else {
            self.rules.push(rule);
        }
        self
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    /// Extract every matching field from `utterance`. Never fails.
    pub fn extract(&self, utterance: &str) -> Entities {
        let mut entities = Entities::new();

        for rule in &self.rules {
            if entities.contains_key(&rule.field) {
                continue;
            }
            let value = match (rule.field, rule.apply(utterance)) {
                (_, None) => None,
                (Field::Name, Some(value)) => trim_name(value).map(str::to_string),
                (_, Some(value)) => Some(value.to_string()),
            };
            if let Some(value) = value {
                entities.insert(rule.field, value);
            }
        }

        if let Some(category) = self.emergency_category(utterance) {
            entities.insert(Field::EmergencyCategory, category.to_string());
        }

        entities
    }

    /// First keyword in table order that occurs in the utterance
    pub fn emergency_category(&self, utterance: &str) -> Option<&str> {
        let lowered = utterance.to_lowercase();
        self.keywords
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword.as_str()))
            .map(|(_, category)| category.as_str())
    }
}
