//! Bigram successor lists attached to terminal nodes.
//!
//! A list is serialized as one or more entry arrays. Entries inside an array
//! are adjacent; an entry with the has-next flag clear ends the array, and
//! the 3-byte continuation link that follows (self-relative, 0 = none)
//! chains to an overflow array appended by a later mutation. Entries are
//! never rewritten except for in-place probability updates and the deleted
//! bit.

use super::buffers::{ByteWriter, DictBuffers};
use super::{DictPos, NOT_A_DICT_POS};

pub(crate) const FLAG_HAS_NEXT: u8 = 0x80;
pub(crate) const FLAG_DELETED: u8 = 0x40;

/// flags(1) + probability(1) + target(3)
const ENTRY_SIZE: DictPos = 5;
const LINK_SIZE: DictPos = 3;

/// Highest storable bigram refinement (4 useful bits).
pub const MAX_BIGRAM_ENCODED_PROBABILITY: i32 = 15;

#[derive(Debug, Clone, Copy)]
pub(crate) struct BigramEntry {
    /// Position of this entry's flags byte.
    pub entry_pos: DictPos,
    /// Absolute position of the successor's PtNode head (possibly a moved
    /// node; callers resolve).
    pub target_pos: DictPos,
    pub probability: i32,
    pub deleted: bool,
}

/// Iterate every entry of the list starting at `list_pos`, following
/// continuation links. Deleted entries are included; callers filter.
pub(crate) struct BigramListIterator<'a> {
    buffers: &'a DictBuffers,
    pos: DictPos,
    /// Set once the current array's last entry has been yielded.
    at_link: bool,
    steps: u32,
}

/// Guards against link cycles in a corrupt image.
const MAX_BIGRAM_LIST_STEPS: u32 = 10_000;

impl<'a> BigramListIterator<'a> {
    pub(crate) fn new(buffers: &'a DictBuffers, list_pos: DictPos) -> Self {
        Self {
            buffers,
            pos: list_pos,
            at_link: false,
            steps: 0,
        }
    }
}

impl Iterator for BigramListIterator<'_> {
    type Item = BigramEntry;

    fn next(&mut self) -> Option<BigramEntry> {
        loop {
            if self.pos == NOT_A_DICT_POS {
                return None;
            }
            self.steps += 1;
            if self.steps > MAX_BIGRAM_LIST_STEPS {
                tracing::debug!(pos = self.pos, "bigram list too long, assuming corrupt");
                return None;
            }
            if self.at_link {
                self.pos = self.buffers.read_position(self.pos);
                self.at_link = false;
                continue;
            }
            let flags = self.buffers.read_u8(self.pos)?;
            let probability = self.buffers.read_u8(self.pos + 1)? as i32;
            let target_pos = self.buffers.read_position(self.pos + 2);
            let entry = BigramEntry {
                entry_pos: self.pos,
                target_pos,
                probability,
                deleted: flags & FLAG_DELETED != 0,
            };
            if flags & FLAG_HAS_NEXT != 0 {
                self.pos += ENTRY_SIZE;
            } else {
                self.pos += ENTRY_SIZE;
                self.at_link = true;
            }
            return Some(entry);
        }
    }
}

/// Position just past the inline (first) array of a list, including its
/// continuation link. `None` when the image is truncated.
pub(crate) fn skip_list(buffers: &DictBuffers, list_pos: DictPos) -> Option<DictPos> {
    let mut pos = list_pos;
    loop {
        let flags = buffers.read_u8(pos)?;
        buffers.read_u8(pos + ENTRY_SIZE - 1)?;
        pos += ENTRY_SIZE;
        if flags & FLAG_HAS_NEXT == 0 {
            buffers.read_u8(pos + LINK_SIZE - 1)?;
            return Some(pos + LINK_SIZE);
        }
    }
}

/// Serialize a fresh one-array list.
pub(crate) fn write_list(writer: &mut ByteWriter, entries: &[(DictPos, i32)]) {
    for (i, &(target, probability)) in entries.iter().enumerate() {
        let has_next = i + 1 < entries.len();
        write_entry(writer, target, probability, has_next);
    }
    writer.put_position(NOT_A_DICT_POS);
}

fn write_entry(writer: &mut ByteWriter, target: DictPos, probability: i32, has_next: bool) {
    let flags = if has_next { FLAG_HAS_NEXT } else { 0 };
    writer.put_u8(flags);
    writer.put_u8(probability.clamp(0, MAX_BIGRAM_ENCODED_PROBABILITY) as u8);
    writer.put_position(target);
}

/// Position of the continuation-link field ending the chain (the one that a
/// new overflow array gets patched into).
pub(crate) fn final_link_pos(buffers: &DictBuffers, list_pos: DictPos) -> Option<DictPos> {
    let mut pos = list_pos;
    let mut steps = 0;
    loop {
        steps += 1;
        if steps > MAX_BIGRAM_LIST_STEPS {
            return None;
        }
        let flags = buffers.read_u8(pos)?;
        pos += ENTRY_SIZE;
        if flags & FLAG_HAS_NEXT != 0 {
            continue;
        }
        match buffers.read_position(pos) {
            NOT_A_DICT_POS => return Some(pos),
            next => pos = next,
        }
    }
}

/// Patch an entry's probability in place.
pub(crate) fn update_probability(buffers: &mut DictBuffers, entry_pos: DictPos, probability: i32) -> bool {
    buffers.patch_u8(
        entry_pos + 1,
        probability.clamp(0, MAX_BIGRAM_ENCODED_PROBABILITY) as u8,
    )
}

/// Set the deleted bit on an entry.
pub(crate) fn mark_deleted(buffers: &mut DictBuffers, entry_pos: DictPos) -> bool {
    match buffers.read_u8(entry_pos) {
        Some(flags) => buffers.patch_u8(entry_pos, flags | FLAG_DELETED),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffers_with_list(entries: &[(DictPos, i32)]) -> (DictBuffers, DictPos) {
        let mut buffers = DictBuffers::from_owned(vec![0u8; 8], true);
        let mut w = ByteWriter::new(8);
        write_list(&mut w, entries);
        let pos = buffers.append(&w.into_bytes()).unwrap();
        (buffers, pos)
    }

    #[test]
    fn test_iterate_single_array() {
        let (buffers, pos) = buffers_with_list(&[(2, 7), (4, 15)]);
        let entries: Vec<_> = BigramListIterator::new(&buffers, pos).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!((entries[0].target_pos, entries[0].probability), (2, 7));
        assert_eq!((entries[1].target_pos, entries[1].probability), (4, 15));
        assert!(!entries[0].deleted);
    }

    #[test]
    fn test_continuation_chain() {
        let (mut buffers, pos) = buffers_with_list(&[(2, 3)]);
        // Append an overflow array and patch the final link.
        let link = final_link_pos(&buffers, pos).unwrap();
        let mut w = ByteWriter::new(buffers.len() as DictPos);
        write_list(&mut w, &[(6, 9)]);
        let overflow = buffers.append(&w.into_bytes()).unwrap();
        assert!(buffers.patch_position(link, overflow));

        let entries: Vec<_> = BigramListIterator::new(&buffers, pos).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].target_pos, 6);
        // The final link is now at the end of the overflow array.
        assert_eq!(final_link_pos(&buffers, pos), Some(overflow + 5));
    }

    #[test]
    fn test_mark_deleted_and_update() {
        let (mut buffers, pos) = buffers_with_list(&[(2, 3), (4, 5)]);
        let first = BigramListIterator::new(&buffers, pos).next().unwrap();
        assert!(update_probability(&mut buffers, first.entry_pos, 12));
        assert!(mark_deleted(&mut buffers, first.entry_pos));
        let entries: Vec<_> = BigramListIterator::new(&buffers, pos).collect();
        assert!(entries[0].deleted);
        assert_eq!(entries[0].probability, 12);
        assert!(!entries[1].deleted);
    }

    #[test]
    fn test_skip_list_spans_inline_array_only() {
        let (buffers, pos) = buffers_with_list(&[(2, 3), (4, 5)]);
        // Two 5-byte entries plus the 3-byte link.
        assert_eq!(skip_list(&buffers, pos), Some(pos + 13));
    }
}
