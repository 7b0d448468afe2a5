//! Binary dictionary storage: a dynamically-updatable Patricia trie keyed by
//! code points, with unigram probabilities, bigram successor lists, shortcut
//! targets and (on decaying dictionaries) forgetting-curve history.
//!
//! The byte format is append-only: mutations stage new nodes onto an
//! extendable tail and publish them with small in-place pointer patches, so
//! a reader never observes a half-written node. `flush_with_gc` rebuilds a
//! compact image with every moved/deleted mark resolved.

mod bigram_list;
mod buffers;
mod gc;
mod header;
mod io;
mod multi_bigram_map;
pub(crate) mod pt_node;
pub(crate) mod pt_trie;
mod shortcut_list;
mod writer;

pub mod forgetting_curve;
pub mod probability;

#[cfg(test)]
mod tests;

pub use forgetting_curve::HistoricalInfo;
pub use header::{DictHeader, FormatVersion};
pub use multi_bigram_map::MultiBigramMap;
pub use shortcut_list::{ShortcutTarget, WHITELIST_SHORTCUT_PROBABILITY};

use buffers::DictBuffers;
use pt_trie::PtTrieReader;
use tracing::debug;
use writer::{PtTrieWriter, WriteOutcome};

/// One Unicode scalar; 0 terminates an output buffer, negative values are
/// sentinels.
pub type CodePoint = i32;
pub const NOT_A_CODE_POINT: CodePoint = -1;

/// Byte offset into the dictionary image, used as node identity.
pub type DictPos = i32;
pub const NOT_A_DICT_POS: DictPos = -1;

pub const MAX_WORD_LENGTH: usize = 48;
pub const MAX_PROBABILITY: i32 = 255;
pub const NOT_A_PROBABILITY: i32 = -1;

/// Positions are 22-bit on disk, capping an image at 4 MiB.
pub const ADDRESS_MASK: u32 = 0x3F_FFFF;

/// Unified error type for dictionary I/O and mutation.
///
/// The read path never produces these: malformed data degrades to sentinel
/// returns. Mutations fail loudly but atomically.
#[derive(Debug, thiserror::Error)]
pub enum DictError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid header")]
    InvalidHeader,

    #[error("invalid magic bytes (expected TPDX)")]
    InvalidMagic,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u16),

    #[error("dictionary image is full")]
    OutOfSpace,

    #[error("dictionary is not updatable")]
    ReadOnly,

    #[error("word not found")]
    WordNotFound,

    #[error("bigram not found")]
    BigramNotFound,

    #[error("invalid word")]
    InvalidWord,

    #[error("dictionary image is corrupt")]
    Malformed,
}

/// Attribute flags carried by a terminal. Not-a-word entries exist only to
/// anchor shortcuts or bigrams; blacklisted entries are recognized but
/// never offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordAttributes {
    pub is_not_a_word: bool,
    pub is_blacklisted: bool,
}

/// An open dictionary: parsed header plus the byte image.
pub struct Dictionary {
    header: DictHeader,
    buffers: DictBuffers,
}

impl Dictionary {
    /// Create an empty updatable dictionary in memory.
    pub fn new_dynamic(version: FormatVersion, locale: &str) -> Result<Self, DictError> {
        if !version.is_updatable() {
            return Err(DictError::ReadOnly);
        }
        let mut header = DictHeader::new_empty(version, locale);
        let mut image = header.serialize();
        // Empty root array: zero nodes, null forward link.
        image.push(0);
        image.extend_from_slice(&[0, 0, 0]);
        Ok(Self {
            header,
            buffers: DictBuffers::from_owned(image, true),
        })
    }

    pub fn header(&self) -> &DictHeader {
        &self.header
    }

    pub fn version(&self) -> FormatVersion {
        self.header.version()
    }

    pub fn unigram_count(&self) -> u32 {
        self.header.unigram_count()
    }

    pub fn bigram_count(&self) -> u32 {
        self.header.bigram_count()
    }

    pub(crate) fn reader(&self) -> PtTrieReader<'_> {
        PtTrieReader::new(&self.buffers, self.header.version(), self.header.root_pos())
    }

    fn writer(&mut self) -> Result<PtTrieWriter<'_>, DictError> {
        if !self.header.version().is_updatable() {
            return Err(DictError::ReadOnly);
        }
        if !self.buffers.is_writable() {
            return Err(DictError::ReadOnly);
        }
        Ok(PtTrieWriter::new(
            &mut self.buffers,
            self.header.version(),
            self.header.root_pos(),
        ))
    }

    // --- read surface ----------------------------------------------------

    /// Terminal position of `word`, or `NOT_A_DICT_POS`.
    pub fn find_terminal(&self, word: &[CodePoint], force_lower_case: bool) -> DictPos {
        self.reader().lookup(word, force_lower_case)
    }

    pub fn is_valid_word(&self, word: &[CodePoint]) -> bool {
        self.find_terminal(word, false) != NOT_A_DICT_POS
    }

    /// Raw stored unigram probability of `word`.
    pub fn probability_of(&self, word: &[CodePoint]) -> i32 {
        let pos = self.find_terminal(word, false);
        if pos == NOT_A_DICT_POS {
            return NOT_A_PROBABILITY;
        }
        match self.reader().node(pos) {
            Some(params) => params.probability,
            None => NOT_A_PROBABILITY,
        }
    }

    /// Effective unigram probability of the terminal at `pos`: raw on static
    /// and v3 dictionaries, decayed through the forgetting curve on v4.
    pub fn effective_probability(&self, terminal_pos: DictPos, now: u32) -> i32 {
        let Some(params) = self.reader().node(terminal_pos) else {
            return NOT_A_PROBABILITY;
        };
        if !params.is_terminal() {
            return NOT_A_PROBABILITY;
        }
        match (self.header.version().has_historical_info(), &params.historical) {
            (true, Some(info)) => forgetting_curve::decode_probability(info, now, &self.header),
            _ => params.probability,
        }
    }

    /// Reconstruct the word ending at `terminal_pos` with its raw
    /// probability.
    pub fn word_at(&self, terminal_pos: DictPos) -> Option<(Vec<CodePoint>, i32)> {
        self.reader().fetch_word(terminal_pos)
    }

    /// Live bigram successors of the terminal at `pos` as
    /// (target position, encoded probability) pairs.
    pub fn bigrams_for_terminal(&self, pos: DictPos) -> Vec<(DictPos, i32)> {
        let reader = self.reader();
        match reader.node(pos) {
            Some(params) => reader
                .bigram_entries(&params)
                .into_iter()
                .map(|e| (e.target_pos, e.probability))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn is_valid_bigram(&self, prev_word: &[CodePoint], next_word: &[CodePoint]) -> bool {
        let prev = self.find_terminal(prev_word, false);
        let next = self.find_terminal(next_word, false);
        if prev == NOT_A_DICT_POS || next == NOT_A_DICT_POS {
            return false;
        }
        self.bigrams_for_terminal(prev)
            .iter()
            .any(|&(target, _)| target == next)
    }

    pub fn shortcuts_of(&self, terminal_pos: DictPos) -> Vec<ShortcutTarget> {
        let reader = self.reader();
        match reader.node(terminal_pos) {
            Some(params) => reader.shortcut_targets(&params),
            None => Vec::new(),
        }
    }

    /// Every (word, raw probability) pair, by pre-order walk.
    pub fn all_words(&self) -> Vec<(Vec<CodePoint>, i32)> {
        fn walk(
            reader: &PtTrieReader,
            array_pos: DictPos,
            prefix: &mut Vec<CodePoint>,
            out: &mut Vec<(Vec<CodePoint>, i32)>,
        ) {
            if prefix.len() > MAX_WORD_LENGTH {
                return;
            }
            for params in reader.children(array_pos) {
                let label_len = params.code_points.len();
                prefix.extend_from_slice(&params.code_points);
                if params.is_terminal() {
                    out.push((prefix.clone(), params.probability));
                }
                if params.has_children() {
                    walk(reader, params.children_pos, prefix, out);
                }
                prefix.truncate(prefix.len() - label_len);
            }
        }

        let reader = self.reader();
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        walk(&reader, self.header.root_pos(), &mut prefix, &mut out);
        out
    }

    // --- mutation surface ------------------------------------------------

    /// Insert `word` or overwrite its probability.
    pub fn add_unigram(
        &mut self,
        word: &[CodePoint],
        probability: i32,
        now: u32,
    ) -> Result<(), DictError> {
        self.add_unigram_with_attributes(word, probability, WordAttributes::default(), now)
    }

    /// Insert `word` with explicit attribute flags (not-a-word entries for
    /// shortcut anchors, blacklisted entries).
    pub fn add_unigram_with_attributes(
        &mut self,
        word: &[CodePoint],
        probability: i32,
        attributes: WordAttributes,
        now: u32,
    ) -> Result<(), DictError> {
        let outcome = self
            .writer()?
            .add_unigram(word, probability, attributes, now)?;
        if outcome == WriteOutcome::Created {
            let count = self.header.unigram_count() + 1;
            self.header.set_unigram_count(count);
        }
        debug!(len = word.len(), probability, ?outcome, "add_unigram");
        Ok(())
    }

    /// Attribute flags of the terminal at `pos`.
    pub fn word_attributes(&self, terminal_pos: DictPos) -> WordAttributes {
        match self.reader().node(terminal_pos) {
            Some(params) => WordAttributes {
                is_not_a_word: params.is_not_a_word(),
                is_blacklisted: params.is_blacklisted(),
            },
            None => WordAttributes::default(),
        }
    }

    /// Add or refresh the bigram `prev_word → next_word`. Both words must
    /// already be terminals.
    pub fn add_bigram(
        &mut self,
        prev_word: &[CodePoint],
        next_word: &[CodePoint],
        probability: i32,
    ) -> Result<(), DictError> {
        let prev = self.find_terminal(prev_word, false);
        let next = self.find_terminal(next_word, false);
        if prev == NOT_A_DICT_POS || next == NOT_A_DICT_POS {
            return Err(DictError::WordNotFound);
        }
        let outcome = self.writer()?.add_bigram(prev, next, probability)?;
        if outcome == WriteOutcome::Created {
            let count = self.header.bigram_count() + 1;
            self.header.set_bigram_count(count);
        }
        Ok(())
    }

    /// Mark the bigram `prev_word → next_word` deleted.
    pub fn remove_bigram(
        &mut self,
        prev_word: &[CodePoint],
        next_word: &[CodePoint],
    ) -> Result<(), DictError> {
        let prev = self.find_terminal(prev_word, false);
        let next = self.find_terminal(next_word, false);
        if prev == NOT_A_DICT_POS || next == NOT_A_DICT_POS {
            return Err(DictError::WordNotFound);
        }
        if !self.writer()?.remove_bigram(prev, next)? {
            return Err(DictError::BigramNotFound);
        }
        let count = self.header.bigram_count().saturating_sub(1);
        self.header.set_bigram_count(count);
        Ok(())
    }

    /// Attach a shortcut target to an existing word.
    pub fn add_shortcut(
        &mut self,
        word: &[CodePoint],
        target: ShortcutTarget,
    ) -> Result<(), DictError> {
        let pos = self.find_terminal(word, false);
        if pos == NOT_A_DICT_POS {
            return Err(DictError::WordNotFound);
        }
        self.writer()?.add_shortcut(pos, target)
    }

    /// Whether the dictionary has outgrown its configured entry counts and
    /// the caller should flush with GC.
    pub fn needs_gc(&self) -> bool {
        self.header.uses_forgetting_curve()
            && forgetting_curve::needs_to_decay(
                self.header.unigram_count(),
                self.header.bigram_count(),
                &self.header,
            )
    }
}
