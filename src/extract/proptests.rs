//! Property-based tests for entity extraction

use super::*;
use proptest::prelude::*;

fn arb_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z ,.:]{0,20}",
        Just("Name: ".to_string()),
        Just("my name is ".to_string()),
        Just("phone ".to_string()),
        Just("address: ".to_string()),
        Just("2024-05-01".to_string()),
        Just("555-1234".to_string()),
        Just("10:30 am".to_string()),
        Just("chest pain".to_string()),
        Just("bleeding".to_string()),
        Just("someone@example.org".to_string()),
    ]
}

fn arb_utterance() -> impl Strategy<Value = String> {
    proptest::collection::vec(arb_fragment(), 0..8).prop_map(|parts| parts.concat())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: regex-derived values are trimmed, non-empty substrings of the input
    #[test]
    fn prop_values_are_trimmed_substrings(utterance in arb_utterance()) {
        let entities = EntityExtractor::default().extract(&utterance);
        for (field, value) in &entities {
            if *field == Field::EmergencyCategory {
                continue;
            }
            prop_assert!(!value.is_empty(), "{field} is empty");
            prop_assert_eq!(value.trim(), value.as_str());
            prop_assert!(utterance.contains(value.as_str()), "{field}={value:?} not in {utterance:?}");
        }
    }

    // Invariant 2: the category always comes from the keyword table
    #[test]
    fn prop_category_comes_from_table(utterance in arb_utterance()) {
        let entities = EntityExtractor::default().extract(&utterance);
        if let Some(category) = entities.get(&Field::EmergencyCategory) {
            prop_assert!(EMERGENCY_KEYWORDS.iter().any(|(_, c)| c == category));
        }
    }

    // Invariant 3: extraction is referentially transparent
    #[test]
    fn prop_extraction_is_deterministic(utterance in ".{0,80}") {
        let extractor = EntityExtractor::default();
        prop_assert_eq!(extractor.extract(&utterance), extractor.extract(&utterance));
    }

    // Invariant 4: arbitrary input never panics and stays in the vocabulary
    #[test]
    fn prop_fields_in_vocabulary(utterance in "\\PC{0,120}") {
        let entities = EntityExtractor::default().extract(&utterance);
        prop_assert!(entities.keys().all(|f| Field::ALL.contains(f)));
        prop_assert!(entities.len() <= Field::ALL.len());
    }
}
