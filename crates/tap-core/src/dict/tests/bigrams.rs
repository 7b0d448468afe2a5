use super::{add, new_dict};
use crate::dict::{DictError, MultiBigramMap, NOT_A_DICT_POS};
use crate::dict::probability;
use crate::unicode::code_points_from_str;

fn cps(word: &str) -> Vec<i32> {
    code_points_from_str(word)
}

#[test]
fn test_add_and_query_bigram() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    add(&mut dict, "nap", 90);
    dict.add_bigram(&cps("cat"), &cps("nap"), 8).unwrap();

    assert!(dict.is_valid_bigram(&cps("cat"), &cps("nap")));
    assert!(!dict.is_valid_bigram(&cps("nap"), &cps("cat")));
    assert_eq!(dict.bigram_count(), 1);
}

#[test]
fn test_add_bigram_requires_both_terminals() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    assert!(matches!(
        dict.add_bigram(&cps("cat"), &cps("nap"), 8),
        Err(DictError::WordNotFound)
    ));
    assert!(matches!(
        dict.add_bigram(&cps("dog"), &cps("cat"), 8),
        Err(DictError::WordNotFound)
    ));
}

#[test]
fn test_second_bigram_appends_to_list() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    add(&mut dict, "nap", 90);
    add(&mut dict, "food", 80);
    dict.add_bigram(&cps("cat"), &cps("nap"), 8).unwrap();
    dict.add_bigram(&cps("cat"), &cps("food"), 5).unwrap();

    assert!(dict.is_valid_bigram(&cps("cat"), &cps("nap")));
    assert!(dict.is_valid_bigram(&cps("cat"), &cps("food")));
    assert_eq!(dict.bigram_count(), 2);
}

#[test]
fn test_re_adding_updates_probability_not_count() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    add(&mut dict, "nap", 90);
    dict.add_bigram(&cps("cat"), &cps("nap"), 3).unwrap();
    dict.add_bigram(&cps("cat"), &cps("nap"), 12).unwrap();
    assert_eq!(dict.bigram_count(), 1);

    let prev = dict.find_terminal(&cps("cat"), false);
    let bigrams = dict.bigrams_for_terminal(prev);
    assert_eq!(bigrams.len(), 1);
    assert_eq!(bigrams[0].1, 12);
}

#[test]
fn test_remove_bigram() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    add(&mut dict, "nap", 90);
    dict.add_bigram(&cps("cat"), &cps("nap"), 8).unwrap();
    dict.remove_bigram(&cps("cat"), &cps("nap")).unwrap();

    assert!(!dict.is_valid_bigram(&cps("cat"), &cps("nap")));
    assert_eq!(dict.bigram_count(), 0);
    assert!(matches!(
        dict.remove_bigram(&cps("cat"), &cps("nap")),
        Err(DictError::BigramNotFound)
    ));
}

#[test]
fn test_bigram_survives_target_split() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    add(&mut dict, "nap", 90);
    dict.add_bigram(&cps("cat"), &cps("nap"), 8).unwrap();
    // Splitting the target's node moves it; the stored target position must
    // resolve through the word-identity redirect.
    add(&mut dict, "na", 50);
    assert!(dict.is_valid_bigram(&cps("cat"), &cps("nap")));
}

#[test]
fn test_bigram_survives_source_move() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    add(&mut dict, "nap", 90);
    dict.add_bigram(&cps("cat"), &cps("nap"), 8).unwrap();
    // Adding a shortcut moves the source node (list copy).
    dict.add_shortcut(
        &cps("cat"),
        crate::dict::ShortcutTarget {
            code_points: cps("kitty"),
            probability: 4,
        },
    )
    .unwrap();
    assert!(dict.is_valid_bigram(&cps("cat"), &cps("nap")));
}

#[test]
fn test_multi_bigram_map_matches_direct_scan() {
    let mut dict = new_dict();
    add(&mut dict, "cat", 200);
    add(&mut dict, "nap", 90);
    add(&mut dict, "dog", 80);
    dict.add_bigram(&cps("cat"), &cps("nap"), 8).unwrap();

    let prev = dict.find_terminal(&cps("cat"), false);
    let nap = dict.find_terminal(&cps("nap"), false);
    let dog = dict.find_terminal(&cps("dog"), false);
    assert_ne!(prev, NOT_A_DICT_POS);

    let mut map = MultiBigramMap::new();
    // Cached answer equals the composition the codec produces.
    assert_eq!(
        map.get_bigram_probability(&dict, prev, nap, 90),
        probability::bigram(90, 8)
    );
    // A pair with no bigram entry backs off.
    assert_eq!(
        map.get_bigram_probability(&dict, prev, dog, 80),
        probability::backoff(80)
    );
    // Asking again hits the cache and must agree bit for bit.
    assert_eq!(
        map.get_bigram_probability(&dict, prev, nap, 90),
        probability::bigram(90, 8)
    );
}
