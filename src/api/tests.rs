use tap_core::dict::{Dictionary, FormatVersion, MAX_WORD_LENGTH};
use tap_core::suggest::{InputPoint, ProximityInfo, MAX_RESULTS};
use tap_core::unicode::{code_points_from_str, string_from_code_points};
use tempfile::tempdir;

use super::engine::Engine;
use super::session::SuggestSession;
use super::types::EngineError;

fn cps(word: &str) -> Vec<i32> {
    code_points_from_str(word)
}

fn typed(word: &str) -> Vec<InputPoint> {
    word.chars()
        .map(|c| InputPoint::from_code_point(c as i32))
        .collect()
}

fn scenario_engine() -> Engine {
    let mut dict = Dictionary::new_dynamic(FormatVersion::DynamicV3, "en").unwrap();
    for (word, probability) in [("cat", 200), ("car", 180), ("card", 160), ("nap", 90)] {
        dict.add_unigram(&cps(word), probability, 0).unwrap();
    }
    dict.add_bigram(&cps("cat"), &cps("nap"), 8).unwrap();
    let mut engine = Engine::new();
    engine.add_dictionary(dict);
    engine
}

fn flat_suggest(
    engine: &Engine,
    input: &str,
    prev_word: Option<&str>,
) -> (usize, Vec<i32>, Vec<i32>, Vec<i32>, Vec<i32>) {
    let proximity = ProximityInfo::qwerty();
    let mut session = SuggestSession::new();
    let codes: Vec<i32> = input.chars().map(|c| c as i32).collect();
    let n = codes.len();
    let prev = prev_word.map(cps);

    let mut out_words = vec![0i32; MAX_RESULTS * MAX_WORD_LENGTH];
    let mut frequencies = vec![0i32; MAX_RESULTS];
    let mut indices = vec![0i32; MAX_RESULTS];
    let mut types = vec![0i32; MAX_RESULTS];
    let count = engine.get_suggestions(
        &proximity,
        &mut session,
        &vec![-1; n],
        &vec![-1; n],
        &vec![0; n],
        &vec![0; n],
        &codes,
        prev.as_deref(),
        &mut out_words,
        &mut frequencies,
        &mut indices,
        &mut types,
    );
    (count, out_words, frequencies, indices, types)
}

fn word_at_slot(out_words: &[i32], slot: usize) -> String {
    string_from_code_points(&out_words[slot * MAX_WORD_LENGTH..(slot + 1) * MAX_WORD_LENGTH])
}

#[test]
fn test_exact_typing_through_flat_interface() {
    let engine = scenario_engine();
    let (count, out_words, frequencies, _, _) = flat_suggest(&engine, "cat", None);

    assert!(count >= 2);
    assert!(count <= MAX_RESULTS);
    assert_eq!(word_at_slot(&out_words, 0), "cat");
    assert_eq!(frequencies[0], 240);
    // Scores arrive in descending order.
    assert!(frequencies[..count].windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_prediction_through_flat_interface() {
    let engine = scenario_engine();
    let (count, out_words, frequencies, _, types) = flat_suggest(&engine, "", Some("cat"));

    assert_eq!(count, 1);
    assert_eq!(word_at_slot(&out_words, 0), "nap");
    assert!(frequencies[0] > 90, "composed, not unigram: {}", frequencies[0]);
    assert_eq!(types[0], 1); // prediction
}

#[test]
fn test_suggestions_merge_across_dictionaries() {
    let mut engine = scenario_engine();
    let user_dict = Dictionary::new_dynamic(FormatVersion::DynamicV4, "en").unwrap();
    let idx = engine.add_dictionary(user_dict);
    // Inserted at the engine's clock so the decaying entry reads as fresh.
    engine.add_unigram_word(idx, &cps("catz"), 240).unwrap();

    let proximity = ProximityInfo::qwerty();
    let mut session = SuggestSession::new();
    let results = engine.suggestions(&proximity, &mut session, &typed("cat"), None);
    let words: Vec<String> = results
        .iter()
        .map(|s| string_from_code_points(&s.code_points))
        .collect();
    assert!(words.contains(&"cat".to_string()));
    assert!(words.contains(&"catz".to_string()));
}

#[test]
fn test_management_operations_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("user.tpd");

    let mut engine = Engine::new();
    let idx = engine.add_dictionary(
        Dictionary::new_dynamic(FormatVersion::DynamicV3, "en").unwrap(),
    );
    engine.add_unigram_word(idx, &cps("hello"), 150).unwrap();
    engine.add_unigram_word(idx, &cps("world"), 140).unwrap();
    engine
        .add_bigram_words(idx, &cps("hello"), &cps("world"), 10)
        .unwrap();

    assert!(engine.is_valid_word(&cps("hello")));
    assert!(engine.is_valid_bigram(&cps("hello"), &cps("world")));
    assert_eq!(engine.get_probability(&cps("hello")), 150);

    engine
        .remove_bigram_words(idx, &cps("hello"), &cps("world"))
        .unwrap();
    assert!(!engine.is_valid_bigram(&cps("hello"), &cps("world")));

    engine.flush_with_gc(idx, &path).unwrap();
    let mut reopened = Engine::new();
    reopened.open_dictionary(&path).unwrap();
    assert!(reopened.is_valid_word(&cps("hello")));
}

#[test]
fn test_bad_dictionary_index() {
    let mut engine = Engine::new();
    assert!(matches!(
        engine.add_unigram_word(3, &cps("x"), 10),
        Err(EngineError::NoSuchDictionary(3))
    ));
}
