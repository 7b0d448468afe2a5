//! The engine handle: owns the open dictionaries and merges their
//! suggestions into one ranked list.

use std::path::Path;

use tap_core::dict::{CodePoint, DictError, Dictionary, NOT_A_DICT_POS, NOT_A_PROBABILITY};
use tap_core::suggest::{
    self, InputPoint, ProximityInfo, Suggestion, SuggestionResults, MAX_RESULTS,
};
use tracing::debug;

use super::session::SuggestSession;
use super::types::{now_epoch, EngineError};

pub struct Engine {
    dictionaries: Vec<Dictionary>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            dictionaries: Vec::new(),
        }
    }

    /// Add an open dictionary. Dictionaries are consulted in insertion
    /// order; suggestions merge into a single ranked list.
    pub fn add_dictionary(&mut self, dict: Dictionary) -> usize {
        self.dictionaries.push(dict);
        self.dictionaries.len() - 1
    }

    pub fn open_dictionary(&mut self, path: &Path) -> Result<usize, DictError> {
        Ok(self.add_dictionary(Dictionary::open(path)?))
    }

    pub fn dictionary(&self, index: usize) -> Option<&Dictionary> {
        self.dictionaries.get(index)
    }

    pub fn dictionary_mut(&mut self, index: usize) -> Option<&mut Dictionary> {
        self.dictionaries.get_mut(index)
    }

    /// Decode suggestions for the typed input against every dictionary.
    pub fn suggestions(
        &self,
        proximity: &ProximityInfo,
        session: &mut SuggestSession,
        input: &[InputPoint],
        prev_word: Option<&[CodePoint]>,
    ) -> Vec<Suggestion> {
        self.merged_results(proximity, session, input, prev_word)
            .into_vec()
    }

    fn merged_results(
        &self,
        proximity: &ProximityInfo,
        session: &mut SuggestSession,
        input: &[InputPoint],
        prev_word: Option<&[CodePoint]>,
    ) -> SuggestionResults {
        let now = now_epoch();
        let mut merged = SuggestionResults::new(MAX_RESULTS);
        for dict in &self.dictionaries {
            let results = suggest::get_suggestions(
                dict,
                proximity,
                session.traverse_mut(),
                input,
                prev_word,
                now,
            );
            for suggestion in results.into_vec() {
                merged.insert(suggestion);
            }
        }
        debug!(count = merged.len(), "merged suggestions");
        merged
    }

    /// Flat-array entry point: assembles input points from the caller's
    /// parallel arrays and fills the fixed-stride output slots. Returns the
    /// number of suggestions written.
    #[allow(clippy::too_many_arguments)]
    pub fn get_suggestions(
        &self,
        proximity: &ProximityInfo,
        session: &mut SuggestSession,
        xs: &[i32],
        ys: &[i32],
        times: &[i32],
        pointer_ids: &[i32],
        codes: &[CodePoint],
        prev_word: Option<&[CodePoint]>,
        out_words: &mut [CodePoint],
        frequencies: &mut [i32],
        output_indices: &mut [i32],
        output_types: &mut [i32],
    ) -> usize {
        let input: Vec<InputPoint> = (0..codes.len())
            .map(|i| InputPoint {
                x: xs.get(i).copied().unwrap_or(-1),
                y: ys.get(i).copied().unwrap_or(-1),
                time: times.get(i).copied().unwrap_or(0),
                pointer_id: pointer_ids.get(i).copied().unwrap_or(0),
                code_point: codes[i],
            })
            .collect();

        self.merged_results(proximity, session, &input, prev_word)
            .fill_output(out_words, frequencies, output_indices, output_types)
    }

    // --- read queries across dictionaries --------------------------------

    pub fn is_valid_word(&self, word: &[CodePoint]) -> bool {
        self.dictionaries.iter().any(|d| d.is_valid_word(word))
    }

    pub fn is_valid_bigram(&self, prev_word: &[CodePoint], next_word: &[CodePoint]) -> bool {
        self.dictionaries
            .iter()
            .any(|d| d.is_valid_bigram(prev_word, next_word))
    }

    /// Highest effective probability of `word` across dictionaries.
    pub fn get_probability(&self, word: &[CodePoint]) -> i32 {
        let now = now_epoch();
        self.dictionaries
            .iter()
            .map(|d| {
                let pos = d.find_terminal(word, false);
                if pos == NOT_A_DICT_POS {
                    NOT_A_PROBABILITY
                } else {
                    d.effective_probability(pos, now)
                }
            })
            .max()
            .unwrap_or(NOT_A_PROBABILITY)
    }

    // --- management on one dictionary ------------------------------------

    pub fn add_unigram_word(
        &mut self,
        dict_index: usize,
        word: &[CodePoint],
        probability: i32,
    ) -> Result<(), EngineError> {
        let now = now_epoch();
        Ok(self.dict_mut(dict_index)?.add_unigram(word, probability, now)?)
    }

    pub fn add_bigram_words(
        &mut self,
        dict_index: usize,
        prev_word: &[CodePoint],
        next_word: &[CodePoint],
        probability: i32,
    ) -> Result<(), EngineError> {
        Ok(self
            .dict_mut(dict_index)?
            .add_bigram(prev_word, next_word, probability)?)
    }

    pub fn remove_bigram_words(
        &mut self,
        dict_index: usize,
        prev_word: &[CodePoint],
        next_word: &[CodePoint],
    ) -> Result<(), EngineError> {
        Ok(self
            .dict_mut(dict_index)?
            .remove_bigram(prev_word, next_word)?)
    }

    pub fn flush(&mut self, dict_index: usize, path: &Path) -> Result<(), EngineError> {
        Ok(self.dict_mut(dict_index)?.flush(path)?)
    }

    pub fn flush_with_gc(&mut self, dict_index: usize, path: &Path) -> Result<(), EngineError> {
        let now = now_epoch();
        Ok(self.dict_mut(dict_index)?.flush_with_gc(path, now)?)
    }

    fn dict_mut(&mut self, index: usize) -> Result<&mut Dictionary, EngineError> {
        self.dictionaries
            .get_mut(index)
            .ok_or(EngineError::NoSuchDictionary(index))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
