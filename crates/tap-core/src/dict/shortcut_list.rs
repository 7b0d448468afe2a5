//! Shortcut target lists attached to terminal nodes.
//!
//! Same array-plus-continuation-link scheme as bigram lists, but entries
//! carry a replacement word inline instead of a trie position. Probability
//! 15 marks a whitelist entry (the target is offered in place of the typed
//! word).

use super::buffers::{ByteWriter, DictBuffers};
use super::{CodePoint, DictPos, NOT_A_DICT_POS};

const FLAG_HAS_NEXT: u8 = 0x80;
const FLAG_DELETED: u8 = 0x40;
const LINK_SIZE: DictPos = 3;

pub const WHITELIST_SHORTCUT_PROBABILITY: i32 = 15;

#[derive(Debug, Clone)]
pub struct ShortcutTarget {
    pub code_points: Vec<CodePoint>,
    pub probability: i32,
}

impl ShortcutTarget {
    pub fn is_whitelist(&self) -> bool {
        self.probability >= WHITELIST_SHORTCUT_PROBABILITY
    }
}

pub(crate) struct ShortcutListIterator<'a> {
    buffers: &'a DictBuffers,
    pos: DictPos,
    at_link: bool,
    steps: u32,
}

const MAX_SHORTCUT_LIST_STEPS: u32 = 10_000;

impl<'a> ShortcutListIterator<'a> {
    pub(crate) fn new(buffers: &'a DictBuffers, list_pos: DictPos) -> Self {
        Self {
            buffers,
            pos: list_pos,
            at_link: false,
            steps: 0,
        }
    }
}

impl Iterator for ShortcutListIterator<'_> {
    type Item = ShortcutTarget;

    fn next(&mut self) -> Option<ShortcutTarget> {
        loop {
            if self.pos == NOT_A_DICT_POS {
                return None;
            }
            self.steps += 1;
            if self.steps > MAX_SHORTCUT_LIST_STEPS {
                tracing::debug!(pos = self.pos, "shortcut list too long, assuming corrupt");
                return None;
            }
            if self.at_link {
                self.pos = self.buffers.read_position(self.pos);
                self.at_link = false;
                continue;
            }
            let flags = self.buffers.read_u8(self.pos)?;
            let probability = self.buffers.read_u8(self.pos + 1)? as i32;
            let count = self.buffers.read_u8(self.pos + 2)? as DictPos;
            let mut code_points = Vec::with_capacity(count as usize);
            for i in 0..count {
                code_points.push(self.buffers.read_u24(self.pos + 3 + 3 * i)? as CodePoint);
            }
            let end = self.pos + 3 + 3 * count;
            if flags & FLAG_HAS_NEXT != 0 {
                self.pos = end;
            } else {
                self.pos = end;
                self.at_link = true;
            }
            if flags & FLAG_DELETED != 0 {
                continue;
            }
            return Some(ShortcutTarget {
                code_points,
                probability,
            });
        }
    }
}

/// Position just past the inline (first) array, including its link field.
pub(crate) fn skip_list(buffers: &DictBuffers, list_pos: DictPos) -> Option<DictPos> {
    let mut pos = list_pos;
    loop {
        let flags = buffers.read_u8(pos)?;
        let count = buffers.read_u8(pos + 2)? as DictPos;
        pos += 3 + 3 * count;
        buffers.read_u8(pos - 1)?;
        if flags & FLAG_HAS_NEXT == 0 {
            buffers.read_u8(pos + LINK_SIZE - 1)?;
            return Some(pos + LINK_SIZE);
        }
    }
}

pub(crate) fn write_list(writer: &mut ByteWriter, targets: &[ShortcutTarget]) {
    for (i, target) in targets.iter().enumerate() {
        let flags = if i + 1 < targets.len() { FLAG_HAS_NEXT } else { 0 };
        writer.put_u8(flags);
        writer.put_u8(target.probability.clamp(0, WHITELIST_SHORTCUT_PROBABILITY) as u8);
        writer.put_u8(target.code_points.len() as u8);
        for &cp in &target.code_points {
            let raw = (cp.max(0) as u32) & 0xFF_FFFF;
            writer.put_u8(raw as u8);
            writer.put_u8((raw >> 8) as u8);
            writer.put_u8((raw >> 16) as u8);
        }
    }
    writer.put_position(NOT_A_DICT_POS);
}

/// Chain-end link position, for appending an overflow array.
pub(crate) fn final_link_pos(buffers: &DictBuffers, list_pos: DictPos) -> Option<DictPos> {
    let mut pos = list_pos;
    let mut steps = 0;
    loop {
        steps += 1;
        if steps > MAX_SHORTCUT_LIST_STEPS {
            return None;
        }
        let flags = buffers.read_u8(pos)?;
        let count = buffers.read_u8(pos + 2)? as DictPos;
        pos += 3 + 3 * count;
        if flags & FLAG_HAS_NEXT != 0 {
            continue;
        }
        match buffers.read_position(pos) {
            NOT_A_DICT_POS => return Some(pos),
            next => pos = next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unicode::code_points_from_str;

    #[test]
    fn test_round_trip() {
        let targets = vec![
            ShortcutTarget {
                code_points: code_points_from_str("won't"),
                probability: WHITELIST_SHORTCUT_PROBABILITY,
            },
            ShortcutTarget {
                code_points: code_points_from_str("wont"),
                probability: 4,
            },
        ];
        let mut buffers = DictBuffers::from_owned(vec![0u8; 8], true);
        let mut w = ByteWriter::new(8);
        write_list(&mut w, &targets);
        let pos = buffers.append(&w.into_bytes()).unwrap();

        let read: Vec<_> = ShortcutListIterator::new(&buffers, pos).collect();
        assert_eq!(read.len(), 2);
        assert!(read[0].is_whitelist());
        assert_eq!(read[0].code_points, targets[0].code_points);
        assert_eq!(read[1].probability, 4);

        let end = skip_list(&buffers, pos).unwrap();
        assert_eq!(end as usize, buffers.len());
    }
}
