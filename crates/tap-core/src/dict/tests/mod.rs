mod bigrams;
mod props;
mod trie;

use super::{Dictionary, FormatVersion};
use crate::unicode::code_points_from_str;

fn new_dict() -> Dictionary {
    Dictionary::new_dynamic(FormatVersion::DynamicV3, "en").unwrap()
}

fn add(dict: &mut Dictionary, word: &str, probability: i32) {
    dict.add_unigram(&code_points_from_str(word), probability, 0)
        .unwrap();
}

fn lookup(dict: &Dictionary, word: &str) -> i32 {
    dict.probability_of(&code_points_from_str(word))
}
