//! Trie read path: word lookup, child enumeration and word reconstruction.
//!
//! All operations are sentinel-based. A malformed image (bad offset, cycle,
//! truncated node) degrades to "absent" and is logged at debug level; the
//! caller never sees an error.

use tracing::debug;

use super::bigram_list::{BigramEntry, BigramListIterator};
use super::buffers::DictBuffers;
use super::pt_node::{self, PtNodeParams};
use super::shortcut_list::{ShortcutListIterator, ShortcutTarget};
use super::{CodePoint, DictPos, FormatVersion, MAX_WORD_LENGTH, NOT_A_DICT_POS};
use crate::unicode::to_lower;

/// Forward-link chains longer than this are treated as corrupt.
const MAX_ARRAY_CHAIN_LENGTH: u32 = 100_000;

pub(crate) struct PtTrieReader<'a> {
    buffers: &'a DictBuffers,
    version: FormatVersion,
    root_pos: DictPos,
}

impl<'a> PtTrieReader<'a> {
    pub(crate) fn new(buffers: &'a DictBuffers, version: FormatVersion, root_pos: DictPos) -> Self {
        Self {
            buffers,
            version,
            root_pos,
        }
    }

    pub(crate) fn root_pos(&self) -> DictPos {
        self.root_pos
    }

    /// Read the live node at `pos` (following a moved redirect).
    pub(crate) fn node(&self, pos: DictPos) -> Option<PtNodeParams> {
        pt_node::read(self.buffers, self.version, pos)
    }

    /// Canonical (live) head position for a possibly-moved node position.
    pub(crate) fn resolve(&self, pos: DictPos) -> DictPos {
        match self.node(pos) {
            Some(params) => params.head_pos,
            None => NOT_A_DICT_POS,
        }
    }

    /// Enumerate the live children below `array_pos`, following forward
    /// links and redirects, skipping deleted nodes.
    pub(crate) fn children(&self, array_pos: DictPos) -> Vec<PtNodeParams> {
        let mut out = Vec::new();
        self.walk_arrays(array_pos, |params| {
            out.push(params);
            true
        });
        out
    }

    /// Walk every live node of a sibling chain; the visitor returns false to
    /// stop early. Returns false when the walk was stopped.
    pub(crate) fn walk_arrays<F: FnMut(PtNodeParams) -> bool>(
        &self,
        array_pos: DictPos,
        mut visit: F,
    ) -> bool {
        let mut pos = array_pos;
        let mut chain = 0;
        while pos != NOT_A_DICT_POS {
            chain += 1;
            if chain > MAX_ARRAY_CHAIN_LENGTH {
                debug!(array_pos, "forward-link chain too long, assuming corrupt");
                return true;
            }
            let Some(header) = pt_node::read_array_header(self.buffers, pos) else {
                debug!(pos, "unreadable node array header");
                return true;
            };
            let mut node_pos = header.first_node_pos;
            for _ in 0..header.count {
                let Some(raw) = pt_node::read_raw(self.buffers, self.version, node_pos) else {
                    debug!(node_pos, "unreadable node in array");
                    return true;
                };
                if !raw.is_deleted() {
                    let live = if raw.is_moved() {
                        // Enumeration wants the node replacing this slot in
                        // the tree, not the word-identity target.
                        match pt_node::read_structural(self.buffers, self.version, node_pos) {
                            Some(params) => Some(params),
                            None => {
                                debug!(node_pos, "dangling moved-node redirect");
                                None
                            }
                        }
                    } else {
                        Some(raw.clone())
                    };
                    if let Some(live) = live {
                        if !visit(live) {
                            return false;
                        }
                    }
                }
                node_pos = raw.end_pos;
            }
            // The forward link sits right after the last node.
            pos = self.buffers.read_position(node_pos);
        }
        true
    }

    /// Find the terminal for `word`. Returns `NOT_A_DICT_POS` when absent or
    /// when the matching node is not a terminal.
    pub(crate) fn lookup(&self, word: &[CodePoint], force_lower_case: bool) -> DictPos {
        if word.is_empty() || word.len() > MAX_WORD_LENGTH {
            return NOT_A_DICT_POS;
        }
        let fold = |cp: CodePoint| if force_lower_case { to_lower(cp) } else { cp };

        let mut array_pos = self.root_pos;
        let mut matched = 0usize;
        loop {
            let mut found: Option<PtNodeParams> = None;
            self.walk_arrays(array_pos, |params| {
                if params.code_points[0] == fold(word[matched]) {
                    found = Some(params);
                    false
                } else {
                    true
                }
            });
            let Some(params) = found else {
                return NOT_A_DICT_POS;
            };

            // The first code point matched; the rest of a merged label must
            // match contiguously.
            let label = &params.code_points;
            if matched + label.len() > word.len() {
                return NOT_A_DICT_POS;
            }
            for (i, &cp) in label.iter().enumerate().skip(1) {
                if cp != fold(word[matched + i]) {
                    return NOT_A_DICT_POS;
                }
            }
            matched += label.len();

            if matched == word.len() {
                return if params.is_terminal() {
                    params.head_pos
                } else {
                    NOT_A_DICT_POS
                };
            }
            if !params.has_children() {
                return NOT_A_DICT_POS;
            }
            array_pos = params.children_pos;
        }
    }

    /// Reconstruct the word ending at `terminal_pos` by walking parent
    /// links, together with its raw stored probability.
    pub(crate) fn fetch_word(&self, terminal_pos: DictPos) -> Option<(Vec<CodePoint>, i32)> {
        let terminal = self.node(terminal_pos)?;
        if !terminal.is_terminal() {
            return None;
        }
        let probability = terminal.probability;

        let mut reversed: Vec<CodePoint> = Vec::new();
        let mut current = Some(terminal);
        while let Some(params) = current {
            if reversed.len() + params.code_points.len() > MAX_WORD_LENGTH {
                debug!(terminal_pos, "word too long while walking parents");
                return None;
            }
            reversed.extend(params.code_points.iter().rev());
            if params.parent_pos == NOT_A_DICT_POS {
                current = None;
            } else {
                current = Some(self.node(params.parent_pos)?);
            }
        }
        reversed.reverse();
        Some((reversed, probability))
    }

    /// Live bigram entries of a terminal, with resolved target positions.
    pub(crate) fn bigram_entries(&self, params: &PtNodeParams) -> Vec<BigramEntry> {
        if !params.has_bigrams() {
            return Vec::new();
        }
        BigramListIterator::new(self.buffers, params.bigrams_pos)
            .filter(|e| !e.deleted)
            .map(|mut e| {
                e.target_pos = self.resolve(e.target_pos);
                e
            })
            .filter(|e| e.target_pos != NOT_A_DICT_POS)
            .collect()
    }

    /// Shortcut targets of a terminal.
    pub(crate) fn shortcut_targets(&self, params: &PtNodeParams) -> Vec<ShortcutTarget> {
        if !params.has_shortcuts() {
            return Vec::new();
        }
        ShortcutListIterator::new(self.buffers, params.shortcuts_pos).collect()
    }
}
