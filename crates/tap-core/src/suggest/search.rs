//! The best-first suggestion decoder.
//!
//! Frontier nodes are popped in cost order and expanded against the input:
//! exact and proximity matches, omissions (which double as completions),
//! interior and trailing excessive characters, transpositions and word
//! breaks. Terminals whose input is consumed become candidates scored by
//! composite probability times the accumulated demotion rates.

use tracing::{debug, debug_span};

use super::dic_node::DicNode;
use super::dic_node_vector::DicNodeVector;
use super::proximity::ProximityInfo;
use super::results::{Suggestion, SuggestionKind, SuggestionResults};
use super::scoring::{
    classify, improbability, MatchKind, COST_NEW_WORD, DISTANCE_WEIGHT_LANGUAGE,
    DISTANCE_WEIGHT_LENGTH, INSERTION_COST, OMISSION_COST, PROXIMITY_COST,
    SPACE_SUBSTITUTION_COST, SUBSTITUTION_COST, TRANSPOSITION_COST,
};
use super::InputPoint;
use crate::dict::{
    CodePoint, DictPos, Dictionary, MultiBigramMap, MAX_WORD_LENGTH, NOT_A_DICT_POS,
    NOT_A_PROBABILITY,
};
use crate::dict::probability;
use crate::settings::settings;
use crate::unicode::to_lower;

/// Reusable per-call search state. Holds no information across calls; the
/// engine keeps one per input session to reuse allocations.
pub struct TraverseSession {
    frontier: DicNodeVector,
    bigram_map: MultiBigramMap,
}

impl TraverseSession {
    pub fn new() -> Self {
        Self {
            frontier: DicNodeVector::new(settings().search.frontier_capacity),
            bigram_map: MultiBigramMap::new(),
        }
    }

    fn reset(&mut self) {
        self.frontier.clear();
        self.bigram_map.clear();
    }
}

impl Default for TraverseSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode suggestions for a typed input sequence, optionally biased by the
/// previous word. With an empty input this degenerates to bigram
/// prediction from the previous word.
pub fn get_suggestions(
    dict: &Dictionary,
    proximity: &ProximityInfo,
    session: &mut TraverseSession,
    input: &[InputPoint],
    prev_word: Option<&[CodePoint]>,
    now: u32,
) -> SuggestionResults {
    let s = settings();
    let _span = debug_span!("get_suggestions", input_size = input.len()).entered();
    let mut results = SuggestionResults::new(s.search.max_results);

    let prev_terminal = resolve_prev_word(dict, prev_word);
    if input.is_empty() {
        if prev_terminal != NOT_A_DICT_POS {
            predict_into(dict, prev_terminal, None, now, &mut results);
        }
        return results;
    }
    let input = &input[..input.len().min(MAX_WORD_LENGTH)];

    session.reset();
    session
        .frontier
        .push(DicNode::root(dict.reader().root_pos(), prev_terminal));
    let max_depth = (s.search.depth_budget_multiplier * input.len()).min(MAX_WORD_LENGTH);
    let mut budget = s.search.frontier_capacity * s.search.depth_budget_multiplier * input.len();

    while let Some(node) = session.frontier.pop_best() {
        if budget == 0 {
            debug!("expansion budget exhausted");
            break;
        }
        budget -= 1;
        if results.is_full() {
            if let Some(worst) = results.worst_kept_cost() {
                if node.cost > worst + s.search.cost_slack {
                    break;
                }
            }
        }
        expand(dict, proximity, session, input, now, max_depth, &node, &mut results);
    }
    results
}

/// Bigram-successor prediction for an empty input. `first_letter`
/// restricts candidates to those starting with the given code point when
/// the corresponding setting is on.
pub fn predict(
    dict: &Dictionary,
    prev_word: &[CodePoint],
    first_letter: Option<CodePoint>,
    now: u32,
) -> SuggestionResults {
    let mut results = SuggestionResults::new(settings().search.max_results);
    let prev_terminal = resolve_prev_word(dict, Some(prev_word));
    if prev_terminal != NOT_A_DICT_POS {
        predict_into(dict, prev_terminal, first_letter, now, &mut results);
    }
    results
}

fn resolve_prev_word(dict: &Dictionary, prev_word: Option<&[CodePoint]>) -> DictPos {
    let Some(word) = prev_word else {
        return NOT_A_DICT_POS;
    };
    if word.is_empty() {
        return NOT_A_DICT_POS;
    }
    let pos = dict.find_terminal(word, false);
    if pos != NOT_A_DICT_POS {
        return pos;
    }
    dict.find_terminal(word, true)
}

fn expand(
    dict: &Dictionary,
    proximity: &ProximityInfo,
    session: &mut TraverseSession,
    input: &[InputPoint],
    now: u32,
    max_depth: usize,
    node: &DicNode,
    results: &mut SuggestionResults,
) {
    if !node.is_leaving_node() {
        push_consumptions(proximity, session, input, node);
        return;
    }

    if node.is_terminal && node.pt_node_pos != NOT_A_DICT_POS {
        emit_terminal(dict, session, input, now, node, results);
        push_word_break(dict, session, input, now, node);
    }

    if node.children_pos != NOT_A_DICT_POS && node.depth() < max_depth {
        for child in dict.reader().children(node.children_pos) {
            let base = node.into_child(&child);
            push_consumptions(proximity, session, input, &base);
        }
    }
}

/// Generate every way of consuming the node's pending code point against
/// the input, each with its cost and demotion rate.
fn push_consumptions(
    proximity: &ProximityInfo,
    session: &mut TraverseSession,
    input: &[InputPoint],
    base: &DicNode,
) {
    let s = settings();
    let (cp, next_label_cp) = base.pending_code_points();
    let i = base.input_index as usize;

    if i < input.len() {
        match classify(proximity, &input[i], cp) {
            MatchKind::Exact(d) => {
                push(session, base.accept(1, 1, d * DISTANCE_WEIGHT_LENGTH, 100, true));
            }
            MatchKind::Near(d) => {
                push(
                    session,
                    base.accept(
                        1,
                        1,
                        PROXIMITY_COST + d * DISTANCE_WEIGHT_LENGTH,
                        s.scoring.proximity_char_rate,
                        false,
                    ),
                );
            }
            MatchKind::NoMatch => {
                // Substitution outside the proximity set.
                if input.len() >= 3 {
                    push(
                        session,
                        base.accept(
                            1,
                            1,
                            SUBSTITUTION_COST,
                            s.scoring.excessive_char_out_of_proximity_rate,
                            false,
                        ),
                    );
                }
            }
        }

        // Transposed characters: this label code point matches the next
        // input and the following label code point matches this input.
        if let Some(next_cp) = next_label_cp {
            if i + 1 < input.len()
                && to_lower(cp) == to_lower(input[i + 1].code_point)
                && to_lower(next_cp) == to_lower(input[i].code_point)
            {
                push(
                    session,
                    base.accept(2, 2, TRANSPOSITION_COST, s.scoring.transposed_chars_rate, false),
                );
            }
        }

        // Excessive character: the current input sample matched nothing;
        // consume the candidate against the following sample.
        if input.len() >= 3 && i + 1 < input.len() {
            match classify(proximity, &input[i + 1], cp) {
                MatchKind::Exact(d) | MatchKind::Near(d) => {
                    push(
                        session,
                        base.accept(
                            1,
                            2,
                            INSERTION_COST + d * DISTANCE_WEIGHT_LENGTH,
                            s.scoring.excessive_char_rate,
                            false,
                        ),
                    );
                }
                MatchKind::NoMatch => {}
            }
        }
    }

    // Missing character: accept the word's code point without consuming
    // input. Past the end of the input this is the completion path.
    if (i as u32) * 10 >= s.scoring.missing_char_start_index_10x {
        push(
            session,
            base.accept(1, 0, OMISSION_COST, s.scoring.missing_char_rate, false),
        );
    }
}

fn push(session: &mut TraverseSession, node: Option<DicNode>) {
    if let Some(node) = node {
        session.frontier.push(node);
    }
}

/// Composite probability of the node's current word given its previous-word
/// context (the formula the improbability term preserves).
fn composite_probability(
    dict: &Dictionary,
    session: &mut TraverseSession,
    node: &DicNode,
    now: u32,
) -> i32 {
    let unigram = dict.effective_probability(node.pt_node_pos, now);
    if node.prev_word_terminal_pos == NOT_A_DICT_POS {
        return unigram;
    }
    session.bigram_map.get_bigram_probability(
        dict,
        node.prev_word_terminal_pos,
        node.pt_node_pos,
        unigram,
    )
}

fn emit_terminal(
    dict: &Dictionary,
    session: &mut TraverseSession,
    input: &[InputPoint],
    now: u32,
    node: &DicNode,
    results: &mut SuggestionResults,
) {
    let s = settings();
    let unconsumed = input.len() - (node.input_index as usize).min(input.len());
    let trailing_excessive = unconsumed == 1 && input.len() >= 3;
    if unconsumed != 0 && !trailing_excessive {
        return;
    }
    if node.is_blacklisted || node.is_not_a_word {
        // Never suggested as words; an exact match can still surface its
        // whitelist target below.
        if node.exact_only && unconsumed == 0 {
            emit_shortcuts(dict, node, 0, results);
        }
        return;
    }

    let composed = composite_probability(dict, session, node, now);
    if composed == NOT_A_PROBABILITY {
        return;
    }

    let mut weight = node.weight;
    if trailing_excessive {
        weight *= s.scoring.excessive_char_rate as f32 / 100.0;
    } else if node.exact_only {
        weight *= s.scoring.full_match_rate as f32 / 100.0;
    }

    let base = if node.has_multiple_words {
        (node.prev_words_probability_sum + composed.max(0)) / (node.word_count as i32 + 1)
    } else {
        composed
    };
    let score = (base as f32 * weight).round() as i32;
    let cost = node.cost + improbability(composed) * DISTANCE_WEIGHT_LANGUAGE;

    results.insert(Suggestion {
        code_points: node.word().to_vec(),
        score,
        kind: SuggestionKind::Correction,
        input_index: node.word_start_index as i32,
        cost,
    });

    if node.exact_only && unconsumed == 0 && !node.has_multiple_words {
        emit_shortcuts(dict, node, score, results);
    }
}

/// Shortcut targets of an exactly-typed terminal: the whitelist target is
/// offered at the word's own score, others scaled by their 4-bit strength.
fn emit_shortcuts(
    dict: &Dictionary,
    node: &DicNode,
    base_score: i32,
    results: &mut SuggestionResults,
) {
    if !node.has_shortcuts {
        return;
    }
    for target in dict.shortcuts_of(node.pt_node_pos) {
        let (kind, score) = if target.is_whitelist() {
            (SuggestionKind::Whitelist, base_score.max(target.probability))
        } else {
            (
                SuggestionKind::Shortcut,
                probability::bigram(base_score.clamp(0, 255), target.probability)
                    .min(base_score.max(0)),
            )
        };
        results.insert(Suggestion {
            code_points: target.code_points.clone(),
            score,
            kind,
            input_index: -1,
            cost: node.cost,
        });
    }
}

/// A recognized word break: the node's word ends here and the rest of the
/// input starts a new word from the root.
fn push_word_break(
    dict: &Dictionary,
    session: &mut TraverseSession,
    input: &[InputPoint],
    now: u32,
    node: &DicNode,
) {
    let s = settings();
    if input.len() < 3
        || node.input_index as usize >= input.len()
        || node.is_blacklisted
        || node.is_not_a_word
    {
        return;
    }
    let composed = composite_probability(dict, session, node, now);
    if composed == NOT_A_PROBABILITY {
        return;
    }
    let next = node.with_word_break(
        dict.reader().root_pos(),
        composed,
        SPACE_SUBSTITUTION_COST + COST_NEW_WORD,
        s.scoring.missing_space_rate,
    );
    push(session, next);
}

fn predict_into(
    dict: &Dictionary,
    prev_terminal: DictPos,
    first_letter: Option<CodePoint>,
    now: u32,
    results: &mut SuggestionResults,
) {
    let filter = settings().search.filter_predictions_by_first_letter;
    let reader = dict.reader();
    for (target, bigram_probability) in dict.bigrams_for_terminal(prev_terminal) {
        let Some(params) = reader.node(target) else {
            continue;
        };
        if params.is_blacklisted() || params.is_not_a_word() {
            continue;
        }
        let Some((word, _)) = dict.word_at(target) else {
            continue;
        };
        if filter {
            if let Some(first) = first_letter {
                if word.first().map(|&cp| to_lower(cp)) != Some(to_lower(first)) {
                    continue;
                }
            }
        }
        let unigram = dict.effective_probability(target, now);
        let composed = probability::bigram(unigram, bigram_probability);
        if composed == NOT_A_PROBABILITY {
            continue;
        }
        results.insert(Suggestion {
            code_points: word,
            score: composed,
            kind: SuggestionKind::Prediction,
            input_index: -1,
            cost: improbability(composed),
        });
    }
}
