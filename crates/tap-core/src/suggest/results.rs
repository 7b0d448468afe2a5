//! Bounded, score-ordered suggestion list and the flat output contract.

use crate::dict::{CodePoint, MAX_WORD_LENGTH};

pub const MAX_RESULTS: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    Correction,
    Prediction,
    Whitelist,
    Shortcut,
}

impl SuggestionKind {
    /// Integer code written to the caller's outputTypes slot.
    pub fn as_output_type(self) -> i32 {
        match self {
            SuggestionKind::Correction => 0,
            SuggestionKind::Prediction => 1,
            SuggestionKind::Whitelist => 2,
            SuggestionKind::Shortcut => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Suggestion {
    pub code_points: Vec<CodePoint>,
    pub score: i32,
    pub kind: SuggestionKind,
    /// Input provenance: index where the suggestion's last word started, or
    /// -1 for single words.
    pub input_index: i32,
    /// Traversal cost of the node that produced this candidate, used for
    /// the search's termination margin.
    pub(crate) cost: f32,
}

/// Priority structure of at most `capacity` suggestions, ordered by score
/// descending; ties prefer the shorter word.
pub struct SuggestionResults {
    entries: Vec<Suggestion>,
    capacity: usize,
}

impl SuggestionResults {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.clamp(1, MAX_RESULTS),
        }
    }

    pub fn insert(&mut self, suggestion: Suggestion) {
        if suggestion.code_points.is_empty() || suggestion.code_points.len() > MAX_WORD_LENGTH {
            return;
        }
        // The same word can be reached along several paths; keep the best.
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.code_points == suggestion.code_points)
        {
            if suggestion.score > existing.score {
                *existing = suggestion;
                self.entries.sort_by_key(Self::order);
            }
            return;
        }

        let at = self.entries.partition_point(|e| Self::order(e) <= Self::order(&suggestion));
        if at >= self.capacity {
            return;
        }
        self.entries.insert(at, suggestion);
        self.entries.truncate(self.capacity);
    }

    /// Sort key: higher score first, then fewer code points.
    fn order(s: &Suggestion) -> (i64, i64) {
        (-(s.score as i64), s.code_points.len() as i64)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Highest traversal cost among kept candidates (for the termination
    /// margin), meaningful once the list is full.
    pub(crate) fn worst_kept_cost(&self) -> Option<f32> {
        self.entries
            .iter()
            .map(|e| e.cost)
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Suggestion> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Suggestion> {
        self.entries
    }

    /// Fill the caller's flat output arrays: `out_words` is fixed-stride
    /// `MAX_WORD_LENGTH` slots, null-terminated when shorter. Returns the
    /// number of suggestions written.
    pub fn fill_output(
        &self,
        out_words: &mut [CodePoint],
        frequencies: &mut [i32],
        output_indices: &mut [i32],
        output_types: &mut [i32],
    ) -> usize {
        let slots = out_words.len() / MAX_WORD_LENGTH;
        let count = self
            .entries
            .len()
            .min(slots)
            .min(frequencies.len())
            .min(output_indices.len())
            .min(output_types.len());
        for (i, suggestion) in self.entries.iter().take(count).enumerate() {
            let slot = &mut out_words[i * MAX_WORD_LENGTH..(i + 1) * MAX_WORD_LENGTH];
            slot.fill(0);
            for (j, &cp) in suggestion.code_points.iter().take(MAX_WORD_LENGTH).enumerate() {
                slot[j] = cp;
            }
            frequencies[i] = suggestion.score;
            output_indices[i] = suggestion.input_index;
            output_types[i] = suggestion.kind.as_output_type();
        }
        count
    }
}
