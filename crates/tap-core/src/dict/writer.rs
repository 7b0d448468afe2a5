//! Trie mutation: unigram insertion, bigram list updates and the node
//! move/split machinery they ride on.
//!
//! Mutations stage every new byte into a single append, then perform the
//! in-place pointer patches that publish it. A failed append (out of space)
//! therefore leaves the image byte-identical; readers can never observe a
//! half-written node.

use tracing::debug;

use super::bigram_list::{self, BigramListIterator};
use super::buffers::{ByteWriter, DictBuffers};
use super::forgetting_curve::{create_updated_historical_info, HistoricalInfo};
use super::pt_node::{self, PtNodeParams, PtNodeSpec};
use super::shortcut_list::ShortcutTarget;
use super::{
    CodePoint, DictError, DictPos, FormatVersion, WordAttributes, MAX_WORD_LENGTH, NOT_A_DICT_POS,
    NOT_A_PROBABILITY,
};

/// Whether an operation created a new entry (the caller maintains counts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteOutcome {
    Created,
    Updated,
}

pub(crate) struct PtTrieWriter<'a> {
    buffers: &'a mut DictBuffers,
    version: FormatVersion,
    root_pos: DictPos,
}

enum SiblingScan {
    Found(PtNodeParams),
    /// No sibling matched; `last_link_pos` is the final forward-link field
    /// of the chain, where a fresh array gets patched in.
    NotFound { last_link_pos: DictPos },
}

impl<'a> PtTrieWriter<'a> {
    pub(crate) fn new(
        buffers: &'a mut DictBuffers,
        version: FormatVersion,
        root_pos: DictPos,
    ) -> Self {
        Self {
            buffers,
            version,
            root_pos,
        }
    }

    /// Insert or update a unigram. `now` feeds the historical record on
    /// decaying dictionaries and is ignored otherwise.
    pub(crate) fn add_unigram(
        &mut self,
        word: &[CodePoint],
        probability: i32,
        attributes: WordAttributes,
        now: u32,
    ) -> Result<WriteOutcome, DictError> {
        if word.is_empty() || word.len() > MAX_WORD_LENGTH || word.iter().any(|&cp| cp <= 0) {
            return Err(DictError::InvalidWord);
        }
        if probability == NOT_A_PROBABILITY {
            return Err(DictError::InvalidWord);
        }

        let mut matched = 0usize;
        let mut array_pos = self.root_pos;
        let mut parent_pos = NOT_A_DICT_POS;
        loop {
            match self.scan_siblings(array_pos, word[matched])? {
                SiblingScan::Found(params) => {
                    let label = params.code_points.clone();
                    let common = common_prefix_len(&label, &word[matched..]);
                    if common < label.len() {
                        return self.split_node(
                            &params,
                            common,
                            &word[matched..],
                            probability,
                            attributes,
                            now,
                        );
                    }
                    matched += common;
                    if matched == word.len() {
                        return self.set_terminal(&params, probability, attributes, now);
                    }
                    if !params.has_children() {
                        return self.create_children_array(
                            &params,
                            &word[matched..],
                            probability,
                            attributes,
                            now,
                        );
                    }
                    parent_pos = params.head_pos;
                    array_pos = params.children_pos;
                }
                SiblingScan::NotFound { last_link_pos } => {
                    return self.insert_into_chain(
                        parent_pos,
                        last_link_pos,
                        &word[matched..],
                        probability,
                        attributes,
                        now,
                    );
                }
            }
        }
    }

    /// Add or refresh a bigram from `src_pos` to `tgt_pos`.
    pub(crate) fn add_bigram(
        &mut self,
        src_pos: DictPos,
        tgt_pos: DictPos,
        probability: i32,
    ) -> Result<WriteOutcome, DictError> {
        let src = self.read_identity(src_pos)?;
        if !src.is_terminal() {
            return Err(DictError::WordNotFound);
        }
        let tgt = self.read_identity(tgt_pos)?.head_pos;

        if !src.has_bigrams() {
            // Move the source: append a copy that carries a one-entry list.
            let shortcuts = self.collect_shortcuts(&src);
            let bigrams = vec![(tgt, probability)];
            let new_pos = self.append_node_copy(&src, &shortcuts, &bigrams)?;
            self.publish_move(&src, new_pos, new_pos);
            return Ok(WriteOutcome::Created);
        }

        if let Some(entry) = self.find_bigram_entry(&src, tgt) {
            bigram_list::update_probability(self.buffers, entry, probability);
            return Ok(WriteOutcome::Updated);
        }

        let Some(link_pos) = bigram_list::final_link_pos(self.buffers, src.bigrams_pos) else {
            return Err(DictError::Malformed);
        };
        let mut w = ByteWriter::new(self.buffers.len() as DictPos);
        bigram_list::write_list(&mut w, &[(tgt, probability)]);
        let overflow_pos = self.buffers.append(&w.into_bytes())?;
        self.buffers.patch_position(link_pos, overflow_pos);
        Ok(WriteOutcome::Created)
    }

    /// Mark the bigram from `src_pos` to `tgt_pos` deleted. Returns whether
    /// a live entry was found.
    pub(crate) fn remove_bigram(&mut self, src_pos: DictPos, tgt_pos: DictPos) -> Result<bool, DictError> {
        let src = self.read_identity(src_pos)?;
        let tgt = self.read_identity(tgt_pos)?.head_pos;
        if !src.has_bigrams() {
            return Ok(false);
        }
        match self.find_bigram_entry(&src, tgt) {
            Some(entry) => Ok(bigram_list::mark_deleted(self.buffers, entry)),
            None => Ok(false),
        }
    }

    /// Attach a shortcut target to an existing terminal.
    pub(crate) fn add_shortcut(
        &mut self,
        word_pos: DictPos,
        target: ShortcutTarget,
    ) -> Result<(), DictError> {
        let params = self.read_identity(word_pos)?;
        if !params.is_terminal() {
            return Err(DictError::WordNotFound);
        }
        if params.has_shortcuts() {
            let Some(link_pos) =
                super::shortcut_list::final_link_pos(self.buffers, params.shortcuts_pos)
            else {
                return Err(DictError::Malformed);
            };
            let mut w = ByteWriter::new(self.buffers.len() as DictPos);
            super::shortcut_list::write_list(&mut w, std::slice::from_ref(&target));
            let overflow_pos = self.buffers.append(&w.into_bytes())?;
            self.buffers.patch_position(link_pos, overflow_pos);
        } else {
            let bigrams = self.collect_bigrams(&params);
            let shortcuts = vec![target];
            let new_pos = self.append_node_copy(&params, &shortcuts, &bigrams)?;
            self.publish_move(&params, new_pos, new_pos);
        }
        Ok(())
    }

    // --- descent helpers -------------------------------------------------

    fn scan_siblings(&self, array_pos: DictPos, cp: CodePoint) -> Result<SiblingScan, DictError> {
        let mut pos = array_pos;
        let mut guard = 0u32;
        loop {
            guard += 1;
            if guard > 100_000 {
                return Err(DictError::Malformed);
            }
            let Some(header) = pt_node::read_array_header(self.buffers, pos) else {
                return Err(DictError::Malformed);
            };
            let mut node_pos = header.first_node_pos;
            for _ in 0..header.count {
                let Some(raw) = pt_node::read_raw(self.buffers, self.version, node_pos) else {
                    return Err(DictError::Malformed);
                };
                if !raw.is_deleted() {
                    let live = if raw.is_moved() {
                        pt_node::read_structural(self.buffers, self.version, node_pos)
                            .ok_or(DictError::Malformed)?
                    } else {
                        raw.clone()
                    };
                    if live.code_points[0] == cp {
                        return Ok(SiblingScan::Found(live));
                    }
                }
                node_pos = raw.end_pos;
            }
            match self.buffers.read_position(node_pos) {
                NOT_A_DICT_POS => {
                    return Ok(SiblingScan::NotFound {
                        last_link_pos: node_pos,
                    })
                }
                next => pos = next,
            }
        }
    }

    fn read_identity(&self, pos: DictPos) -> Result<PtNodeParams, DictError> {
        pt_node::read(self.buffers, self.version, pos).ok_or(DictError::Malformed)
    }

    fn find_bigram_entry(&self, src: &PtNodeParams, tgt: DictPos) -> Option<DictPos> {
        BigramListIterator::new(self.buffers, src.bigrams_pos)
            .filter(|e| !e.deleted)
            .find(|e| {
                pt_node::read(self.buffers, self.version, e.target_pos)
                    .is_some_and(|p| p.head_pos == tgt)
            })
            .map(|e| e.entry_pos)
    }

    fn collect_shortcuts(&self, params: &PtNodeParams) -> Vec<ShortcutTarget> {
        if !params.has_shortcuts() {
            return Vec::new();
        }
        super::shortcut_list::ShortcutListIterator::new(self.buffers, params.shortcuts_pos).collect()
    }

    fn collect_bigrams(&self, params: &PtNodeParams) -> Vec<(DictPos, i32)> {
        if !params.has_bigrams() {
            return Vec::new();
        }
        BigramListIterator::new(self.buffers, params.bigrams_pos)
            .filter(|e| !e.deleted)
            .map(|e| (e.target_pos, e.probability))
            .collect()
    }

    fn historical_for_new_entry(&self, now: u32) -> Option<HistoricalInfo> {
        self.version
            .has_historical_info()
            .then(|| create_updated_historical_info(None, now))
    }

    // --- the four insertion cases ---------------------------------------

    /// Case 1 and 2: the word ends exactly at an existing node.
    fn set_terminal(
        &mut self,
        params: &PtNodeParams,
        probability: i32,
        attributes: WordAttributes,
        now: u32,
    ) -> Result<WriteOutcome, DictError> {
        if params.is_terminal() {
            let historical = self
                .version
                .has_historical_info()
                .then(|| create_updated_historical_info(params.historical.as_ref(), now));
            if !pt_node::patch_probability(self.buffers, self.version, params, probability, historical)
            {
                return Err(DictError::Malformed);
            }
            if !pt_node::patch_attribute_flags(self.buffers, params, attributes) {
                return Err(DictError::Malformed);
            }
            return Ok(WriteOutcome::Updated);
        }

        // Non-terminal: append a terminal copy and redirect readers to it.
        let shortcuts = self.collect_shortcuts(params);
        let bigrams = self.collect_bigrams(params);
        let spec = PtNodeSpec {
            parent_pos: params.parent_pos,
            code_points: &params.code_points,
            probability,
            historical: self.historical_for_new_entry(now),
            children_pos: params.children_pos,
            is_not_a_word: attributes.is_not_a_word,
            is_blacklisted: attributes.is_blacklisted,
            shortcuts: &shortcuts,
            bigrams: &bigrams,
        };
        let mut w = ByteWriter::new(self.buffers.len() as DictPos);
        pt_node::write_node(&mut w, self.version, &spec);
        let new_pos = self.buffers.append(&w.into_bytes())?;
        self.publish_move(params, new_pos, new_pos);
        Ok(WriteOutcome::Created)
    }

    /// Case 3: the word diverges (or ends) inside a merged label. Split into
    /// a shared-prefix node with one or two children.
    fn split_node(
        &mut self,
        params: &PtNodeParams,
        common: usize,
        word_rest: &[CodePoint],
        probability: i32,
        attributes: WordAttributes,
        now: u32,
    ) -> Result<WriteOutcome, DictError> {
        let label = &params.code_points;
        let prefix = &label[..common];
        let old_suffix = &label[common..];
        let adds_extra_child = word_rest.len() > common;

        let start = self.buffers.len() as DictPos;
        let prefix_is_terminal = !adds_extra_child;
        let prefix_len = node_serialized_size(self.version, prefix.len(), prefix_is_terminal);
        let children_array_pos = start + prefix_len;
        // One size byte precedes the first child.
        let second_part_pos = children_array_pos + 1;

        let mut w = ByteWriter::new(start);
        pt_node::write_node(
            &mut w,
            self.version,
            &PtNodeSpec {
                parent_pos: params.parent_pos,
                code_points: prefix,
                probability: if prefix_is_terminal {
                    probability
                } else {
                    NOT_A_PROBABILITY
                },
                historical: if prefix_is_terminal {
                    self.historical_for_new_entry(now)
                } else {
                    None
                },
                children_pos: children_array_pos,
                is_not_a_word: prefix_is_terminal && attributes.is_not_a_word,
                is_blacklisted: prefix_is_terminal && attributes.is_blacklisted,
                shortcuts: &[],
                bigrams: &[],
            },
        );

        let shortcuts = self.collect_shortcuts(params);
        let bigrams = self.collect_bigrams(params);
        pt_node::write_array_size(&mut w, if adds_extra_child { 2 } else { 1 });
        pt_node::write_node(
            &mut w,
            self.version,
            &PtNodeSpec {
                parent_pos: start,
                code_points: old_suffix,
                probability: params.probability,
                historical: params.historical,
                children_pos: params.children_pos,
                is_not_a_word: params.is_not_a_word(),
                is_blacklisted: params.is_blacklisted(),
                shortcuts: &shortcuts,
                bigrams: &bigrams,
            },
        );
        if adds_extra_child {
            pt_node::write_node(
                &mut w,
                self.version,
                &PtNodeSpec {
                    historical: self.historical_for_new_entry(now),
                    is_not_a_word: attributes.is_not_a_word,
                    is_blacklisted: attributes.is_blacklisted,
                    ..PtNodeSpec::new_terminal(start, &word_rest[common..], probability)
                },
            );
        }
        w.put_position(NOT_A_DICT_POS);

        self.buffers.append(&w.into_bytes())?;
        debug!(
            old = params.head_pos,
            prefix = start,
            suffix = second_part_pos,
            "split merged node"
        );
        self.publish_move(params, start, second_part_pos);
        Ok(WriteOutcome::Created)
    }

    /// Case 4a: the matched node has no children yet.
    fn create_children_array(
        &mut self,
        params: &PtNodeParams,
        word_rest: &[CodePoint],
        probability: i32,
        attributes: WordAttributes,
        now: u32,
    ) -> Result<WriteOutcome, DictError> {
        let mut w = ByteWriter::new(self.buffers.len() as DictPos);
        pt_node::write_single_node_array(
            &mut w,
            self.version,
            &PtNodeSpec {
                historical: self.historical_for_new_entry(now),
                is_not_a_word: attributes.is_not_a_word,
                is_blacklisted: attributes.is_blacklisted,
                ..PtNodeSpec::new_terminal(params.head_pos, word_rest, probability)
            },
        );
        let array_pos = self.buffers.append(&w.into_bytes())?;
        pt_node::patch_children_pos(self.buffers, params, array_pos);
        Ok(WriteOutcome::Created)
    }

    /// Case 4b: no sibling matched; chain a fresh array onto the level.
    fn insert_into_chain(
        &mut self,
        parent_pos: DictPos,
        last_link_pos: DictPos,
        word_rest: &[CodePoint],
        probability: i32,
        attributes: WordAttributes,
        now: u32,
    ) -> Result<WriteOutcome, DictError> {
        let mut w = ByteWriter::new(self.buffers.len() as DictPos);
        pt_node::write_single_node_array(
            &mut w,
            self.version,
            &PtNodeSpec {
                historical: self.historical_for_new_entry(now),
                is_not_a_word: attributes.is_not_a_word,
                is_blacklisted: attributes.is_blacklisted,
                ..PtNodeSpec::new_terminal(parent_pos, word_rest, probability)
            },
        );
        let array_pos = self.buffers.append(&w.into_bytes())?;
        self.buffers.patch_position(last_link_pos, array_pos);
        Ok(WriteOutcome::Created)
    }

    // --- move plumbing ---------------------------------------------------

    fn append_node_copy(
        &mut self,
        params: &PtNodeParams,
        shortcuts: &[ShortcutTarget],
        bigrams: &[(DictPos, i32)],
    ) -> Result<DictPos, DictError> {
        let spec = PtNodeSpec::from_params(params, shortcuts, bigrams);
        let mut w = ByteWriter::new(self.buffers.len() as DictPos);
        pt_node::write_node(&mut w, self.version, &spec);
        Ok(self.buffers.append(&w.into_bytes())?)
    }

    /// Flag the original as moved and repoint its children's parent fields
    /// at the node now carrying the word identity.
    fn publish_move(&mut self, params: &PtNodeParams, moved_pos: DictPos, identity_pos: DictPos) {
        pt_node::mark_moved(self.buffers, params, moved_pos, identity_pos);
        if params.has_children() {
            let heads = self.live_child_heads(params.children_pos);
            for head in heads {
                pt_node::patch_parent_pos(self.buffers, head, identity_pos);
            }
        }
    }

    fn live_child_heads(&self, array_pos: DictPos) -> Vec<DictPos> {
        let mut heads = Vec::new();
        let mut pos = array_pos;
        let mut guard = 0u32;
        while pos != NOT_A_DICT_POS {
            guard += 1;
            if guard > 100_000 {
                break;
            }
            let Some(header) = pt_node::read_array_header(self.buffers, pos) else {
                break;
            };
            let mut node_pos = header.first_node_pos;
            for _ in 0..header.count {
                let Some(raw) = pt_node::read_raw(self.buffers, self.version, node_pos) else {
                    return heads;
                };
                if !raw.is_deleted() {
                    if raw.is_moved() {
                        if let Some(live) =
                            pt_node::read_structural(self.buffers, self.version, node_pos)
                        {
                            heads.push(live.head_pos);
                        }
                    } else {
                        heads.push(raw.head_pos);
                    }
                }
                node_pos = raw.end_pos;
            }
            pos = self.buffers.read_position(node_pos);
        }
        heads
    }
}

fn common_prefix_len(label: &[CodePoint], word_rest: &[CodePoint]) -> usize {
    label
        .iter()
        .zip(word_rest.iter())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Serialized size of a node with no attached lists.
fn node_serialized_size(version: FormatVersion, cp_count: usize, is_terminal: bool) -> DictPos {
    let mut size = 1 + 3 + 1 + 3 * cp_count as DictPos + 3;
    if is_terminal {
        size += 1;
        if version.has_historical_info() {
            size += 7;
        }
    }
    size
}
