use super::{add, lookup, new_dict};
use crate::dict::{Dictionary, FormatVersion, NOT_A_DICT_POS, NOT_A_PROBABILITY};
use crate::unicode::code_points_from_str;

#[test]
fn test_insert_and_lookup_single_word() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    assert_eq!(lookup(&dict, "cat"), 200);
    assert_eq!(lookup(&dict, "ca"), NOT_A_PROBABILITY);
    assert_eq!(lookup(&dict, "cats"), NOT_A_PROBABILITY);
    assert_eq!(dict.unigram_count(), 1);
}

#[test]
fn test_split_on_divergence() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    add(&mut dict, "car", 180);
    assert_eq!(lookup(&dict, "cat"), 200);
    assert_eq!(lookup(&dict, "car"), 180);
    assert_eq!(lookup(&dict, "ca"), NOT_A_PROBABILITY);
    assert_eq!(dict.unigram_count(), 2);
}

#[test]
fn test_extend_leaf_with_child() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    add(&mut dict, "car", 180);
    add(&mut dict, "card", 160);
    assert_eq!(lookup(&dict, "card"), 160);
    assert_eq!(lookup(&dict, "car"), 180);
}

#[test]
fn test_prefix_word_makes_node_terminal() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    add(&mut dict, "car", 180);
    // "ca" is now an existing non-terminal node; adding it flips the
    // terminal flag via a moved copy.
    add(&mut dict, "ca", 90);
    assert_eq!(lookup(&dict, "ca"), 90);
    assert_eq!(lookup(&dict, "cat"), 200);
    assert_eq!(lookup(&dict, "car"), 180);
}

#[test]
fn test_mid_label_prefix_split() {
    let mut dict = new_dict();
    add(&mut dict, "catnip", 140);
    // Word ends inside the merged label: split with a terminal prefix.
    add(&mut dict, "cat", 200);
    assert_eq!(lookup(&dict, "cat"), 200);
    assert_eq!(lookup(&dict, "catnip"), 140);
    assert_eq!(lookup(&dict, "catnap"), NOT_A_PROBABILITY);
}

#[test]
fn test_probability_overwrite_in_place() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    add(&mut dict, "cat", 130);
    assert_eq!(lookup(&dict, "cat"), 130);
    assert_eq!(dict.unigram_count(), 1);
}

#[test]
fn test_sibling_chain_growth() {
    let mut dict = new_dict();
    for (i, word) in ["alpha", "bravo", "charlie", "delta", "echo"]
        .iter()
        .enumerate()
    {
        add(&mut dict, word, 100 + i as i32);
    }
    for (i, word) in ["alpha", "bravo", "charlie", "delta", "echo"]
        .iter()
        .enumerate()
    {
        assert_eq!(lookup(&dict, word), 100 + i as i32, "{word}");
    }
}

#[test]
fn test_fetch_word_round_trip() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    add(&mut dict, "catnip", 140);
    add(&mut dict, "car", 180);

    for (word, prob) in [("cat", 200), ("catnip", 140), ("car", 180)] {
        let cps = code_points_from_str(word);
        let pos = dict.find_terminal(&cps, false);
        assert_ne!(pos, NOT_A_DICT_POS, "{word}");
        let (fetched, p) = dict.word_at(pos).unwrap();
        assert_eq!(fetched, cps, "{word}");
        assert_eq!(p, prob, "{word}");
    }
}

#[test]
fn test_force_lower_case_lookup() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    let mixed = code_points_from_str("CaT");
    assert_eq!(dict.find_terminal(&mixed, false), NOT_A_DICT_POS);
    assert_ne!(dict.find_terminal(&mixed, true), NOT_A_DICT_POS);
}

#[test]
fn test_rejects_invalid_words() {
    let mut dict = new_dict();
    assert!(dict.add_unigram(&[], 10, 0).is_err());
    assert!(dict.add_unigram(&[0], 10, 0).is_err());
    let too_long: Vec<i32> = vec!['a' as i32; 49];
    assert!(dict.add_unigram(&too_long, 10, 0).is_err());
}

#[test]
fn test_static_dictionary_rejects_mutation() {
    assert!(Dictionary::new_dynamic(FormatVersion::Static, "en").is_err());
}

#[test]
fn test_word_attribute_flags_round_trip() {
    let mut dict = new_dict();
    let word = code_points_from_str("tbh");
    dict.add_unigram_with_attributes(
        &word,
        120,
        crate::dict::WordAttributes {
            is_not_a_word: true,
            is_blacklisted: false,
        },
        0,
    )
    .unwrap();

    let pos = dict.find_terminal(&word, false);
    assert_ne!(pos, NOT_A_DICT_POS);
    let attrs = dict.word_attributes(pos);
    assert!(attrs.is_not_a_word);
    assert!(!attrs.is_blacklisted);

    // Re-adding with explicit attributes overwrites the bits in place.
    dict.add_unigram_with_attributes(
        &word,
        130,
        crate::dict::WordAttributes {
            is_not_a_word: false,
            is_blacklisted: true,
        },
        0,
    )
    .unwrap();
    let attrs = dict.word_attributes(dict.find_terminal(&word, false));
    assert!(!attrs.is_not_a_word);
    assert!(attrs.is_blacklisted);
    assert_eq!(lookup(&dict, "tbh"), 130);
}

#[test]
fn test_v4_terminal_carries_historical_info() {
    let mut dict = Dictionary::new_dynamic(FormatVersion::DynamicV4, "en").unwrap();
    let now = 1000;
    dict.add_unigram(&code_points_from_str("cat"), 200, now)
        .unwrap();
    let pos = dict.find_terminal(&code_points_from_str("cat"), false);
    // A fresh entry starts at level 0; its effective probability comes from
    // the decay table, not the raw byte.
    let effective = dict.effective_probability(pos, now);
    assert!(effective >= 0);
    assert_eq!(lookup(&dict, "cat"), 200);
}
