//! Search frontier records.
//!
//! A `DicNode` is a flat, copyable snapshot of one traversal position: a
//! trie node (possibly mid-label), the word accepted so far, the next input
//! position, and the accumulated cost and score weight. Copies are cheap by
//! construction, so expansion builds children by value.

use crate::dict::pt_node::PtNodeParams;
use crate::dict::{CodePoint, DictPos, MAX_WORD_LENGTH, NOT_A_DICT_POS};
use crate::unicode::CODE_POINT_SPACE;

#[derive(Debug, Clone, Copy)]
pub(crate) struct DicNode {
    /// Trie node currently inhabited; `NOT_A_DICT_POS` at the root.
    pub pt_node_pos: DictPos,
    /// Children array of the current node (the root array for the root).
    pub children_pos: DictPos,
    label: [CodePoint; MAX_WORD_LENGTH],
    label_len: u8,
    /// Next label code point to consume; the node is "leaving" once every
    /// label code point has been accepted.
    label_index: u8,
    pub is_terminal: bool,
    pub is_blacklisted: bool,
    pub is_not_a_word: bool,
    pub has_shortcuts: bool,

    word: [CodePoint; MAX_WORD_LENGTH],
    word_len: u8,
    pub input_index: u8,
    pub cost: f32,
    /// Product of demotion/promotion rates applied so far (1.0 = none).
    pub weight: f32,
    /// True while every consumed input matched its key exactly.
    pub exact_only: bool,

    pub has_multiple_words: bool,
    /// Terminal of the previous word within this suggestion, or the caller's
    /// context word for the first one.
    pub prev_word_terminal_pos: DictPos,
    /// Sum of composite probabilities of completed sub-words.
    pub prev_words_probability_sum: i32,
    pub word_count: u8,
    /// Input index where the latest word started (provenance for output).
    pub word_start_index: i8,
}

impl DicNode {
    pub fn root(root_array_pos: DictPos, prev_word_terminal_pos: DictPos) -> Self {
        Self {
            pt_node_pos: NOT_A_DICT_POS,
            children_pos: root_array_pos,
            label: [0; MAX_WORD_LENGTH],
            label_len: 0,
            label_index: 0,
            is_terminal: false,
            is_blacklisted: false,
            is_not_a_word: false,
            has_shortcuts: false,
            word: [0; MAX_WORD_LENGTH],
            word_len: 0,
            input_index: 0,
            cost: 0.0,
            weight: 1.0,
            exact_only: true,
            has_multiple_words: false,
            prev_word_terminal_pos,
            prev_words_probability_sum: 0,
            word_count: 0,
            word_start_index: -1,
        }
    }

    pub fn is_leaving_node(&self) -> bool {
        self.label_index >= self.label_len
    }

    /// Code point the node offers next, with its follower (for
    /// transposition lookahead).
    pub fn pending_code_points(&self) -> (CodePoint, Option<CodePoint>) {
        let i = self.label_index as usize;
        let next = (i + 1 < self.label_len as usize).then(|| self.label[i + 1]);
        (self.label[i], next)
    }

    pub fn word(&self) -> &[CodePoint] {
        &self.word[..self.word_len as usize]
    }

    pub fn word_len(&self) -> usize {
        self.word_len as usize
    }

    /// Depth in accepted code points (label positions consumed so far count
    /// through `word`).
    pub fn depth(&self) -> usize {
        self.word_len as usize
    }

    /// Enter a child trie node; no code point is consumed yet.
    pub fn into_child(&self, params: &PtNodeParams) -> Self {
        let mut child = *self;
        child.pt_node_pos = params.head_pos;
        child.children_pos = params.children_pos;
        child.is_terminal = params.is_terminal();
        child.is_blacklisted = params.is_blacklisted();
        child.is_not_a_word = params.is_not_a_word();
        child.has_shortcuts = params.has_shortcuts();
        child.label = [0; MAX_WORD_LENGTH];
        child.label_len = params.code_points.len().min(MAX_WORD_LENGTH) as u8;
        child.label[..child.label_len as usize]
            .copy_from_slice(&params.code_points[..child.label_len as usize]);
        child.label_index = 0;
        child
    }

    /// Accept `count` label code points (1, or 2 for a transposition),
    /// advancing the input by `input_advance`.
    pub fn accept(
        &self,
        count: usize,
        input_advance: usize,
        cost_delta: f32,
        rate_percent: u32,
        keeps_exact: bool,
    ) -> Option<Self> {
        if self.word_len as usize + count > MAX_WORD_LENGTH {
            return None;
        }
        let mut next = *self;
        for i in 0..count {
            next.word[next.word_len as usize] = self.label[self.label_index as usize + i];
            next.word_len += 1;
        }
        next.label_index += count as u8;
        next.input_index += input_advance as u8;
        next.cost += cost_delta;
        next.weight *= rate_percent as f32 / 100.0;
        if !keeps_exact {
            next.exact_only = false;
        }
        Some(next)
    }

    /// Start a new word at the root after a recognized word break. The
    /// current node must be a terminal; `probability` is its composed
    /// probability as a sub-word.
    pub fn with_word_break(
        &self,
        root_array_pos: DictPos,
        probability: i32,
        cost_delta: f32,
        rate_percent: u32,
    ) -> Option<Self> {
        if self.word_len as usize + 1 >= MAX_WORD_LENGTH {
            return None;
        }
        let mut next = *self;
        next.word[next.word_len as usize] = CODE_POINT_SPACE;
        next.word_len += 1;
        next.pt_node_pos = NOT_A_DICT_POS;
        next.children_pos = root_array_pos;
        next.label = [0; MAX_WORD_LENGTH];
        next.label_len = 0;
        next.label_index = 0;
        next.is_terminal = false;
        next.is_blacklisted = false;
        next.is_not_a_word = false;
        next.has_shortcuts = false;
        next.cost += cost_delta;
        next.weight *= rate_percent as f32 / 100.0;
        next.has_multiple_words = true;
        next.prev_word_terminal_pos = self.pt_node_pos;
        next.prev_words_probability_sum = self.prev_words_probability_sum + probability.max(0);
        next.word_count += 1;
        next.word_start_index = self.input_index as i8;
        Some(next)
    }
}
