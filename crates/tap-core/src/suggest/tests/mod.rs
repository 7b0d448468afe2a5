mod prediction;

use crate::dict::{Dictionary, FormatVersion};
use crate::suggest::{InputPoint, ProximityInfo, SuggestionResults, TraverseSession};
use crate::unicode::{code_points_from_str, string_from_code_points};

/// The scenario dictionary used across decoder tests.
fn scenario_dict() -> Dictionary {
    let mut dict = Dictionary::new_dynamic(FormatVersion::DynamicV3, "en").unwrap();
    for (word, probability) in [("cat", 200), ("car", 180), ("card", 160), ("nap", 90)] {
        dict.add_unigram(&code_points_from_str(word), probability, 0)
            .unwrap();
    }
    dict.add_bigram(
        &code_points_from_str("cat"),
        &code_points_from_str("nap"),
        8,
    )
    .unwrap();
    dict
}

fn typed(word: &str) -> Vec<InputPoint> {
    word.chars()
        .map(|c| InputPoint::from_code_point(c as i32))
        .collect()
}

fn suggest(dict: &Dictionary, input: &str, prev_word: Option<&str>) -> SuggestionResults {
    let proximity = ProximityInfo::qwerty();
    let mut session = TraverseSession::new();
    let prev = prev_word.map(code_points_from_str);
    crate::suggest::get_suggestions(
        dict,
        &proximity,
        &mut session,
        &typed(input),
        prev.as_deref(),
        0,
    )
}

fn words_of(results: &SuggestionResults) -> Vec<String> {
    results
        .iter()
        .map(|s| string_from_code_points(&s.code_points))
        .collect()
}

fn score_of(results: &SuggestionResults, word: &str) -> Option<i32> {
    results
        .iter()
        .find(|s| string_from_code_points(&s.code_points) == word)
        .map(|s| s.score)
}
