//! PtNode serialization: reading a node view out of the buffers and
//! appending freshly built nodes.
//!
//! A node is identified by the byte offset of its flags byte (`head_pos`).
//! Views are non-owning: they carry decoded fields plus the offsets needed
//! for the few legal in-place patches (flags, probability, children link).

use tracing::debug;

use super::bigram_list;
use super::buffers::{ByteWriter, DictBuffers};
use super::forgetting_curve::HistoricalInfo;
use super::shortcut_list::{self, ShortcutTarget};
use super::{CodePoint, DictPos, FormatVersion, MAX_WORD_LENGTH, NOT_A_DICT_POS, NOT_A_PROBABILITY};

pub(crate) const MASK_MOVE_STATUS: u8 = 0xC0;
pub(crate) const FLAG_IS_LIVE: u8 = 0xC0;
pub(crate) const FLAG_IS_MOVED: u8 = 0x40;
pub(crate) const FLAG_IS_DELETED: u8 = 0x80;
pub(crate) const FLAG_HAS_MULTIPLE_CHARS: u8 = 0x20;
pub(crate) const FLAG_IS_TERMINAL: u8 = 0x10;
pub(crate) const FLAG_HAS_SHORTCUTS: u8 = 0x08;
pub(crate) const FLAG_HAS_BIGRAMS: u8 = 0x04;
pub(crate) const FLAG_IS_NOT_A_WORD: u8 = 0x02;
pub(crate) const FLAG_IS_BLACKLISTED: u8 = 0x01;

/// Redirect chains grow by one hop each time the same node moves again;
/// this bound only exists to turn a corrupt cycle into a read failure.
const MAX_MOVE_REDIRECTS: u32 = 10_000;

/// Decoded view of one PtNode.
#[derive(Debug, Clone)]
pub(crate) struct PtNodeParams {
    pub head_pos: DictPos,
    pub flags: u8,
    pub parent_pos: DictPos,
    pub code_points: Vec<CodePoint>,
    pub probability: i32,
    pub historical: Option<HistoricalInfo>,
    /// Offset of the probability byte, for in-place overwrite.
    pub probability_field_pos: DictPos,
    /// Offset of the children link field.
    pub children_field_pos: DictPos,
    pub children_pos: DictPos,
    pub shortcuts_pos: DictPos,
    pub bigrams_pos: DictPos,
    /// First byte past this node's serialization (the next sibling).
    pub end_pos: DictPos,
}

impl PtNodeParams {
    pub fn is_terminal(&self) -> bool {
        self.flags & FLAG_IS_TERMINAL != 0
    }
    pub fn is_deleted(&self) -> bool {
        self.flags & MASK_MOVE_STATUS == FLAG_IS_DELETED
    }
    pub fn is_moved(&self) -> bool {
        self.flags & MASK_MOVE_STATUS == FLAG_IS_MOVED
    }
    pub fn is_not_a_word(&self) -> bool {
        self.flags & FLAG_IS_NOT_A_WORD != 0
    }
    pub fn is_blacklisted(&self) -> bool {
        self.flags & FLAG_IS_BLACKLISTED != 0
    }
    pub fn has_children(&self) -> bool {
        self.children_pos != NOT_A_DICT_POS
    }
    pub fn has_bigrams(&self) -> bool {
        self.bigrams_pos != NOT_A_DICT_POS
    }
    pub fn has_shortcuts(&self) -> bool {
        self.shortcuts_pos != NOT_A_DICT_POS
    }
}

/// Read the node at `pos` without following a moved redirect.
pub(crate) fn read_raw(
    buffers: &DictBuffers,
    version: FormatVersion,
    head_pos: DictPos,
) -> Option<PtNodeParams> {
    let flags = buffers.read_u8(head_pos)?;
    let parent_pos = buffers.read_position(head_pos + 1);
    let count = buffers.read_u8(head_pos + 4)? as usize;
    if count == 0 || count > MAX_WORD_LENGTH {
        debug!(head_pos, count, "implausible code point count");
        return None;
    }
    let mut pos = head_pos + 5;
    let mut code_points = Vec::with_capacity(count);
    for _ in 0..count {
        code_points.push(buffers.read_u24(pos)? as CodePoint);
        pos += 3;
    }

    let is_terminal = flags & FLAG_IS_TERMINAL != 0;
    let mut probability = NOT_A_PROBABILITY;
    let mut probability_field_pos = NOT_A_DICT_POS;
    let mut historical = None;
    if is_terminal {
        probability_field_pos = pos;
        probability = buffers.read_u8(pos)? as i32;
        pos += 1;
        if version.has_historical_info() {
            let timestamp = buffers.read_u24(pos)? | ((buffers.read_u8(pos + 3)? as u32) << 24);
            let level = buffers.read_u8(pos + 4)?;
            let use_count = buffers.read_u16(pos + 5)?;
            historical = Some(HistoricalInfo::new(timestamp, level, use_count));
            pos += 7;
        }
    }

    let children_field_pos = pos;
    let children_pos = buffers.read_position(pos);
    buffers.read_u8(pos + 2)?;
    pos += 3;

    let mut shortcuts_pos = NOT_A_DICT_POS;
    if flags & FLAG_HAS_SHORTCUTS != 0 {
        shortcuts_pos = pos;
        pos = shortcut_list::skip_list(buffers, pos)?;
    }
    let mut bigrams_pos = NOT_A_DICT_POS;
    if flags & FLAG_HAS_BIGRAMS != 0 {
        bigrams_pos = pos;
        pos = bigram_list::skip_list(buffers, pos)?;
    }

    Some(PtNodeParams {
        head_pos,
        flags,
        parent_pos,
        code_points,
        probability,
        historical,
        probability_field_pos,
        children_field_pos,
        children_pos,
        shortcuts_pos,
        bigrams_pos,
        end_pos: pos,
    })
}

/// A moved node carries two redirects: the parent field points at the node
/// that replaces it in its sibling array (after a split, the shared-prefix
/// node), while the children field points at the node that now carries its
/// word identity (the suffix node, or the plain copy). Which one to follow
/// depends on whether the reader is enumerating siblings or resolving a
/// terminal position.
fn read_following(
    buffers: &DictBuffers,
    version: FormatVersion,
    head_pos: DictPos,
    structural: bool,
) -> Option<PtNodeParams> {
    let mut params = read_raw(buffers, version, head_pos)?;
    let mut redirects = 0;
    while params.is_moved() {
        redirects += 1;
        if redirects > MAX_MOVE_REDIRECTS {
            debug!(head_pos, "moved-node redirect chain too long");
            return None;
        }
        let next = if structural {
            params.parent_pos
        } else {
            params.children_pos
        };
        params = read_raw(buffers, version, next)?;
    }
    Some(params)
}

/// Follow a moved node to its replacement at the same tree position. Used
/// when walking sibling arrays.
pub(crate) fn read_structural(
    buffers: &DictBuffers,
    version: FormatVersion,
    head_pos: DictPos,
) -> Option<PtNodeParams> {
    read_following(buffers, version, head_pos, true)
}

/// Follow a moved node to the node carrying its word identity. Used when a
/// position stands for a word: bigram targets, previous-word terminals,
/// parent walks.
pub(crate) fn read(
    buffers: &DictBuffers,
    version: FormatVersion,
    head_pos: DictPos,
) -> Option<PtNodeParams> {
    read_following(buffers, version, head_pos, false)
}

/// Everything needed to serialize a fresh node.
pub(crate) struct PtNodeSpec<'a> {
    pub parent_pos: DictPos,
    pub code_points: &'a [CodePoint],
    pub probability: i32,
    pub historical: Option<HistoricalInfo>,
    pub children_pos: DictPos,
    pub is_not_a_word: bool,
    pub is_blacklisted: bool,
    pub shortcuts: &'a [ShortcutTarget],
    pub bigrams: &'a [(DictPos, i32)],
}

impl<'a> PtNodeSpec<'a> {
    pub fn new_terminal(parent_pos: DictPos, code_points: &'a [CodePoint], probability: i32) -> Self {
        Self {
            parent_pos,
            code_points,
            probability,
            historical: None,
            children_pos: NOT_A_DICT_POS,
            is_not_a_word: false,
            is_blacklisted: false,
            shortcuts: &[],
            bigrams: &[],
        }
    }

    /// Rebuild a spec from an existing node view, dropping deleted list
    /// entries. Used when a node is copied to the tail.
    pub fn from_params(
        params: &'a PtNodeParams,
        shortcuts: &'a [ShortcutTarget],
        bigrams: &'a [(DictPos, i32)],
    ) -> Self {
        Self {
            parent_pos: params.parent_pos,
            code_points: &params.code_points,
            probability: params.probability,
            historical: params.historical,
            children_pos: params.children_pos,
            is_not_a_word: params.is_not_a_word(),
            is_blacklisted: params.is_blacklisted(),
            shortcuts,
            bigrams,
        }
    }
}

/// Serialize one node into `writer`.
pub(crate) fn write_node(writer: &mut ByteWriter, version: FormatVersion, spec: &PtNodeSpec) {
    let is_terminal = spec.probability != NOT_A_PROBABILITY;
    let mut flags = FLAG_IS_LIVE;
    if spec.code_points.len() > 1 {
        flags |= FLAG_HAS_MULTIPLE_CHARS;
    }
    if is_terminal {
        flags |= FLAG_IS_TERMINAL;
    }
    if !spec.shortcuts.is_empty() {
        flags |= FLAG_HAS_SHORTCUTS;
    }
    if !spec.bigrams.is_empty() {
        flags |= FLAG_HAS_BIGRAMS;
    }
    if spec.is_not_a_word {
        flags |= FLAG_IS_NOT_A_WORD;
    }
    if spec.is_blacklisted {
        flags |= FLAG_IS_BLACKLISTED;
    }

    writer.put_u8(flags);
    writer.put_position(spec.parent_pos);
    writer.put_u8(spec.code_points.len() as u8);
    for &cp in spec.code_points {
        let raw = (cp.max(0) as u32) & 0xFF_FFFF;
        writer.put_u8(raw as u8);
        writer.put_u8((raw >> 8) as u8);
        writer.put_u8((raw >> 16) as u8);
    }
    if is_terminal {
        writer.put_u8(spec.probability.clamp(0, 255) as u8);
        if version.has_historical_info() {
            let info = spec.historical.unwrap_or(HistoricalInfo::new(0, 0, 0));
            writer.put_u8(info.timestamp as u8);
            writer.put_u8((info.timestamp >> 8) as u8);
            writer.put_u8((info.timestamp >> 16) as u8);
            writer.put_u8((info.timestamp >> 24) as u8);
            writer.put_u8(info.level);
            writer.put_u16(info.count);
        }
    }
    writer.put_position(spec.children_pos);
    if !spec.shortcuts.is_empty() {
        shortcut_list::write_list(writer, spec.shortcuts);
    }
    if !spec.bigrams.is_empty() {
        bigram_list::write_list(writer, spec.bigrams);
    }
}

/// Patch a node's probability (and, on v4, its historical record) in place.
pub(crate) fn patch_probability(
    buffers: &mut DictBuffers,
    version: FormatVersion,
    params: &PtNodeParams,
    probability: i32,
    historical: Option<HistoricalInfo>,
) -> bool {
    if params.probability_field_pos == NOT_A_DICT_POS {
        return false;
    }
    if !buffers.patch_u8(params.probability_field_pos, probability.clamp(0, 255) as u8) {
        return false;
    }
    if version.has_historical_info() {
        if let Some(info) = historical {
            let pos = params.probability_field_pos + 1;
            for i in 0..4 {
                if !buffers.patch_u8(pos + i, (info.timestamp >> (8 * i)) as u8) {
                    return false;
                }
            }
            if !buffers.patch_u8(pos + 4, info.level) {
                return false;
            }
            if !buffers.patch_u8(pos + 5, info.count as u8) {
                return false;
            }
            if !buffers.patch_u8(pos + 6, (info.count >> 8) as u8) {
                return false;
            }
        }
    }
    true
}

/// Overwrite the not-a-word/blacklisted bits in place, leaving every other
/// flag untouched.
pub(crate) fn patch_attribute_flags(
    buffers: &mut DictBuffers,
    params: &PtNodeParams,
    attributes: super::WordAttributes,
) -> bool {
    let mut flags = params.flags & !(FLAG_IS_NOT_A_WORD | FLAG_IS_BLACKLISTED);
    if attributes.is_not_a_word {
        flags |= FLAG_IS_NOT_A_WORD;
    }
    if attributes.is_blacklisted {
        flags |= FLAG_IS_BLACKLISTED;
    }
    buffers.patch_u8(params.head_pos, flags)
}

/// Flag the node as moved: the parent field gets the structural replacement
/// (same tree position), the children field gets the word-identity
/// replacement. For a plain copy both are the same node; a split points them
/// at the prefix and suffix parts respectively.
pub(crate) fn mark_moved(
    buffers: &mut DictBuffers,
    params: &PtNodeParams,
    moved_pos: DictPos,
    identity_pos: DictPos,
) -> bool {
    let flags = (params.flags & !MASK_MOVE_STATUS) | FLAG_IS_MOVED;
    buffers.patch_u8(params.head_pos, flags)
        && buffers.patch_position(params.head_pos + 1, moved_pos)
        && buffers.patch_position(params.children_field_pos, identity_pos)
}

/// Repoint a node's parent field, used to fix children after their parent
/// moved.
pub(crate) fn patch_parent_pos(buffers: &mut DictBuffers, head_pos: DictPos, parent_pos: DictPos) -> bool {
    buffers.patch_position(head_pos + 1, parent_pos)
}

/// Repoint a node's children link at a freshly appended array.
pub(crate) fn patch_children_pos(
    buffers: &mut DictBuffers,
    params: &PtNodeParams,
    children_pos: DictPos,
) -> bool {
    buffers.patch_position(params.children_field_pos, children_pos)
}

/// Flag the node as deleted. Its bytes stay in place until GC.
pub(crate) fn mark_deleted(buffers: &mut DictBuffers, params: &PtNodeParams) -> bool {
    let flags = (params.flags & !MASK_MOVE_STATUS) | FLAG_IS_DELETED;
    buffers.patch_u8(params.head_pos, flags)
}

// --- PtNode arrays -------------------------------------------------------

/// Decoded array header.
pub(crate) struct PtNodeArrayHeader {
    pub count: usize,
    /// Position of the first node.
    pub first_node_pos: DictPos,
}

/// Array sizes below 0x80 use one byte; larger arrays use two bytes with the
/// high bit of the first set.
pub(crate) fn read_array_header(buffers: &DictBuffers, array_pos: DictPos) -> Option<PtNodeArrayHeader> {
    let b0 = buffers.read_u8(array_pos)?;
    if b0 & 0x80 == 0 {
        Some(PtNodeArrayHeader {
            count: b0 as usize,
            first_node_pos: array_pos + 1,
        })
    } else {
        let b1 = buffers.read_u8(array_pos + 1)?;
        Some(PtNodeArrayHeader {
            count: (((b0 & 0x7F) as usize) << 8) | b1 as usize,
            first_node_pos: array_pos + 2,
        })
    }
}

pub(crate) fn write_array_size(writer: &mut ByteWriter, count: usize) {
    if count < 0x80 {
        writer.put_u8(count as u8);
    } else {
        writer.put_u8(0x80 | ((count >> 8) as u8));
        writer.put_u8(count as u8);
    }
}

/// Serialize a one-node array (the shape every mutation appends): size
/// prefix, the node, and a null forward link.
pub(crate) fn write_single_node_array(
    writer: &mut ByteWriter,
    version: FormatVersion,
    spec: &PtNodeSpec,
) {
    write_array_size(writer, 1);
    write_node(writer, version, spec);
    writer.put_position(NOT_A_DICT_POS);
}
