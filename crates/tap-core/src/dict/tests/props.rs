use std::collections::HashMap;

use proptest::prelude::*;
use tempfile::tempdir;

use crate::dict::{Dictionary, FormatVersion, NOT_A_DICT_POS};

fn word_strategy() -> impl Strategy<Value = Vec<i32>> {
    // Small alphabet to force shared prefixes, splits and sibling chains.
    prop::collection::vec(prop::sample::select(vec![97i32, 98, 99, 100, 101]), 1..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_lookup_round_trip(entries in prop::collection::vec((word_strategy(), 1i32..=255), 1..40)) {
        let mut dict = Dictionary::new_dynamic(FormatVersion::DynamicV3, "en").unwrap();
        let mut expected: HashMap<Vec<i32>, i32> = HashMap::new();
        for (word, probability) in &entries {
            dict.add_unigram(word, *probability, 0).unwrap();
            expected.insert(word.clone(), *probability);
        }

        prop_assert_eq!(dict.unigram_count() as usize, expected.len());
        for (word, probability) in &expected {
            prop_assert_eq!(dict.probability_of(word), *probability);
            let pos = dict.find_terminal(word, false);
            prop_assert_ne!(pos, NOT_A_DICT_POS);
            let (fetched, p) = dict.word_at(pos).unwrap();
            prop_assert_eq!(&fetched, word);
            prop_assert_eq!(p, *probability);
        }
    }

    #[test]
    fn prop_gc_preserves_content(entries in prop::collection::vec((word_strategy(), 1i32..=255), 1..30)) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prop.tpd");

        let mut dict = Dictionary::new_dynamic(FormatVersion::DynamicV3, "en").unwrap();
        let mut expected: HashMap<Vec<i32>, i32> = HashMap::new();
        for (word, probability) in &entries {
            dict.add_unigram(word, *probability, 0).unwrap();
            expected.insert(word.clone(), *probability);
        }
        dict.flush_with_gc(&path, 0).unwrap();

        prop_assert_eq!(dict.unigram_count() as usize, expected.len());
        for (word, probability) in &expected {
            prop_assert_eq!(dict.probability_of(word), *probability);
        }

        let reloaded = Dictionary::open(&path).unwrap();
        for (word, probability) in &expected {
            prop_assert_eq!(reloaded.probability_of(word), *probability);
        }
    }
}
