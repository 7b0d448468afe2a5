use super::{scenario_dict, suggest, words_of};
use crate::dict::probability;
use crate::suggest::{predict, SuggestionKind};
use crate::unicode::{code_points_from_str, string_from_code_points};

#[test]
fn test_empty_input_predicts_bigram_successors() {
    let dict = scenario_dict();
    let results = suggest(&dict, "", Some("cat"));

    assert_eq!(words_of(&results), vec!["nap"]);
    let nap = results.iter().next().unwrap();
    assert_eq!(nap.kind, SuggestionKind::Prediction);
    // Composed through the bigram refinement, not the raw unigram.
    assert_eq!(nap.score, probability::bigram(90, 8));
    assert!(nap.score > 90);
}

#[test]
fn test_prediction_without_context_is_empty() {
    let dict = scenario_dict();
    let results = suggest(&dict, "", None);
    assert!(results.is_empty());

    let unknown = suggest(&dict, "", Some("zebra"));
    assert!(unknown.is_empty());
}

#[test]
fn test_removed_bigram_no_longer_predicted() {
    let mut dict = scenario_dict();
    dict.remove_bigram(&code_points_from_str("cat"), &code_points_from_str("nap"))
        .unwrap();
    let results = suggest(&dict, "", Some("cat"));
    assert!(
        !words_of(&results).contains(&"nap".to_string()),
        "removed bigram still predicted"
    );
}

#[test]
fn test_first_letter_filter() {
    let dict = scenario_dict();
    let matching = predict(&dict, &code_points_from_str("cat"), Some('n' as i32), 0);
    assert_eq!(words_of(&matching), vec!["nap"]);

    let mismatching = predict(&dict, &code_points_from_str("cat"), Some('x' as i32), 0);
    assert!(mismatching.is_empty());
}

#[test]
fn test_predictions_ranked_by_composed_probability() {
    let mut dict = scenario_dict();
    for (word, uni, bi) in [("nib", 60, 15), ("nod", 220, 1)] {
        dict.add_unigram(&code_points_from_str(word), uni, 0).unwrap();
        dict.add_bigram(&code_points_from_str("cat"), &code_points_from_str(word), bi)
            .unwrap();
    }
    let results = predict(&dict, &code_points_from_str("cat"), None, 0);
    let scores: Vec<i32> = results.iter().map(|s| s.score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{scores:?}");
    assert_eq!(results.len(), 3);
    // The low-unigram, high-refinement successor composes to the ceiling.
    let nib = results
        .iter()
        .find(|s| string_from_code_points(&s.code_points) == "nib")
        .unwrap();
    assert_eq!(nib.score, probability::bigram(60, 15));
}

#[test]
fn test_prediction_skips_not_a_word_successor() {
    let mut dict = scenario_dict();
    dict.add_unigram_with_attributes(
        &code_points_from_str("nvm"),
        200,
        crate::dict::WordAttributes {
            is_not_a_word: true,
            is_blacklisted: false,
        },
        0,
    )
    .unwrap();
    dict.add_bigram(&code_points_from_str("cat"), &code_points_from_str("nvm"), 12)
        .unwrap();

    let results = suggest(&dict, "", Some("cat"));
    assert_eq!(words_of(&results), vec!["nap"]);
}

#[test]
fn test_case_folded_previous_word() {
    let dict = scenario_dict();
    let results = suggest(&dict, "", Some("Cat"));
    assert_eq!(words_of(&results), vec!["nap"]);
}
