//! Intent catalog and keyword/regex classifier
//!
//! The catalog is plain configuration data: tag -> trigger patterns,
//! response templates, optional next step. It is built once at startup and
//! changes only through [`IntentCatalog::register`].

mod catalog;
mod classifier;

pub use catalog::{default_catalog, tags};
pub use classifier::classify;

use crate::state_machine::Step;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid trigger pattern for intent '{tag}': {source}")]
    InvalidPattern {
        tag: String,
        #[source]
        source: regex::Error,
    },
    #[error("Intent tag must not be empty")]
    EmptyTag,
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A trigger: literal substring or regex, matched against the lower-cased utterance
#[derive(Debug, Clone)]
pub enum TriggerPattern {
    Literal(String),
    Regex(Regex),
}

impl TriggerPattern {
    pub fn literal(text: &str) -> Self {
        TriggerPattern::Literal(text.to_lowercase())
    }

    /// Whole-word trigger; short tokens like "hi" would otherwise match inside "this"
    pub fn word(token: &str) -> Self {
        let source = format!(r"\b{}\b", regex::escape(&token.to_lowercase()));
        Self::regex(&source).unwrap_or_else(|_| Self::literal(token))
    }

    pub fn regex(source: &str) -> Result<Self, regex::Error> {
        RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map(TriggerPattern::Regex)
    }

    /// Length in characters of the matched text, if the pattern matches
    pub fn matched_len(&self, lowered: &str) -> Option<usize> {
        match self {
            TriggerPattern::Literal(text) => {
                (!text.is_empty() && lowered.contains(text.as_str())).then(|| text.chars().count())
            }
            TriggerPattern::Regex(re) => re.find(lowered).map(|m| m.as_str().chars().count()),
        }
    }

    fn to_entry(&self) -> PatternEntry {
        match self {
            TriggerPattern::Literal(text) => PatternEntry::Literal(text.clone()),
            TriggerPattern::Regex(re) => PatternEntry::Regex {
                regex: re.as_str().to_string(),
            },
        }
    }
}

/// Catalog entry
#[derive(Debug, Clone)]
pub struct IntentDefinition {
    pub tag: String,
    pub patterns: Vec<TriggerPattern>,
    pub responses: Vec<String>,
    pub next_step: Option<Step>,
    pub terminal: bool,
    /// Steps in which this intent gets the context bonus
    pub context_steps: Vec<Step>,
}

impl IntentDefinition {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            patterns: vec![],
            responses: vec![],
            next_step: None,
            terminal: false,
            context_steps: vec![],
        }
    }

    /// An entry that only carries response templates and never wins classification
    pub fn responses_only(tag: impl Into<String>, responses: &[&str]) -> Self {
        Self::new(tag).with_responses(responses)
    }

    pub fn with_literals(mut self, literals: &[&str]) -> Self {
        self.patterns
            .extend(literals.iter().map(|l| TriggerPattern::literal(l)));
        self
    }

    pub fn with_words(mut self, words: &[&str]) -> Self {
        self.patterns.extend(words.iter().map(|w| TriggerPattern::word(w)));
        self
    }

    pub fn with_responses(mut self, responses: &[&str]) -> Self {
        self.responses
            .extend(responses.iter().map(|r| (*r).to_string()));
        self
    }

    pub fn with_next_step(mut self, step: Step) -> Self {
        self.next_step = Some(step);
        self
    }

    pub fn with_context_steps(mut self, steps: &[Step]) -> Self {
        self.context_steps.extend_from_slice(steps);
        self
    }

    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    pub fn to_entry(&self) -> IntentEntry {
        IntentEntry {
            tag: self.tag.clone(),
            patterns: self.patterns.iter().map(TriggerPattern::to_entry).collect(),
            responses: self.responses.clone(),
            next_step: self.next_step,
            terminal: self.terminal,
            context_steps: self.context_steps.clone(),
        }
    }
}

/// Serialized form of a trigger: `"literal"` or `{"regex": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternEntry {
    Literal(String),
    Regex { regex: String },
}

/// Serialized form of an intent definition (catalog files and the API)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentEntry {
    pub tag: String,
    #[serde(default)]
    pub patterns: Vec<PatternEntry>,
    #[serde(default)]
    pub responses: Vec<String>,
    #[serde(default)]
    pub next_step: Option<Step>,
    #[serde(default)]
    pub terminal: bool,
    #[serde(default)]
    pub context_steps: Vec<Step>,
}

impl TryFrom<IntentEntry> for IntentDefinition {
    type Error = CatalogError;

    fn try_from(entry: IntentEntry) -> Result<Self, Self::Error> {
        let tag = entry.tag.trim().to_string();
        if tag.is_empty() {
            return Err(CatalogError::EmptyTag);
        }
        let mut patterns = Vec::with_capacity(entry.patterns.len());
        for pattern in entry.patterns {
            patterns.push(match pattern {
                PatternEntry::Literal(text) => TriggerPattern::literal(&text),
                PatternEntry::Regex { regex } => TriggerPattern::regex(&regex).map_err(|source| {
                    CatalogError::InvalidPattern {
                        tag: tag.clone(),
                        source,
                    }
                })?,
            });
        }
        Ok(Self {
            tag,
            patterns,
            responses: entry.responses,
            next_step: entry.next_step,
            terminal: entry.terminal,
            context_steps: entry.context_steps,
        })
    }
}

/// Ordered tag -> definition map with unique tags
#[derive(Debug, Clone, Default)]
pub struct IntentCatalog {
    entries: Vec<IntentDefinition>,
    index: HashMap<String, usize>,
}

impl IntentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, or overwrite the existing one with the same tag.
    ///
    /// An overwrite keeps the original position, so classification tie-breaks
    /// stay stable across overrides.
    pub fn register(&mut self, definition: IntentDefinition) {
        if let Some(&slot) = self.index.get(&definition.tag) {
            self.entries[slot] = definition;
        } else {
            self.index
                .insert(definition.tag.clone(), self.entries.len());
            self.entries.push(definition);
        }
    }

    pub fn get(&self, tag: &str) -> Option<&IntentDefinition> {
        self.index.get(tag).map(|&slot| &self.entries[slot])
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &IntentDefinition> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register every definition from a JSON array of [`IntentEntry`]s
    pub fn load_json(&mut self, json: &str) -> Result<usize, CatalogError> {
        let entries: Vec<IntentEntry> = serde_json::from_str(json)?;
        let count = entries.len();
        for entry in entries {
            self.register(IntentDefinition::try_from(entry)?);
        }
        Ok(count)
    }

    pub fn load_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<usize, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        self.load_json(&json)
    }
}
