//! Byte storage for a dictionary: an immutable base region (owned bytes or a
//! shared mmap) plus an extendable tail that mutations append to.
//!
//! Positions are byte offsets into the logical concatenation base ++ tail.
//! On-disk position fields are stored as signed 24-bit offsets relative to
//! the field's own location, with 0 meaning "none"; conversion to absolute
//! positions happens at read time. Multi-byte reads return `None` instead of
//! panicking when the position is out of range, so a malformed image
//! degrades to sentinel values higher up.

use memmap2::Mmap;
use tracing::debug;

use super::{DictError, DictPos, ADDRESS_MASK, NOT_A_DICT_POS};

pub(crate) enum BaseStore {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl BaseStore {
    fn as_slice(&self) -> &[u8] {
        match self {
            BaseStore::Owned(v) => v,
            BaseStore::Mapped(m) => m,
        }
    }
}

pub(crate) struct DictBuffers {
    base: BaseStore,
    tail: Vec<u8>,
    writable: bool,
}

impl DictBuffers {
    pub(crate) fn from_owned(bytes: Vec<u8>, writable: bool) -> Self {
        Self {
            base: BaseStore::Owned(bytes),
            tail: Vec::new(),
            writable,
        }
    }

    pub(crate) fn from_mmap(mmap: Mmap) -> Self {
        Self {
            base: BaseStore::Mapped(mmap),
            tail: Vec::new(),
            writable: false,
        }
    }

    pub(crate) fn is_writable(&self) -> bool {
        self.writable
    }

    pub(crate) fn len(&self) -> usize {
        self.base.as_slice().len() + self.tail.len()
    }

    pub(crate) fn tail_len(&self) -> usize {
        self.tail.len()
    }

    fn byte_at(&self, pos: usize) -> Option<u8> {
        let base = self.base.as_slice();
        if pos < base.len() {
            Some(base[pos])
        } else {
            self.tail.get(pos - base.len()).copied()
        }
    }

    fn byte_at_mut(&mut self, pos: usize) -> Option<&mut u8> {
        let base_len = match &mut self.base {
            BaseStore::Owned(v) => {
                if pos < v.len() {
                    return Some(&mut v[pos]);
                }
                v.len()
            }
            BaseStore::Mapped(m) => m.len(),
        };
        self.tail.get_mut(pos - base_len)
    }

    pub(crate) fn read_u8(&self, pos: DictPos) -> Option<u8> {
        if pos < 0 {
            return None;
        }
        self.byte_at(pos as usize)
    }

    pub(crate) fn read_u16(&self, pos: DictPos) -> Option<u16> {
        let b0 = self.read_u8(pos)? as u16;
        let b1 = self.read_u8(pos + 1)? as u16;
        Some(b0 | (b1 << 8))
    }

    pub(crate) fn read_u24(&self, pos: DictPos) -> Option<u32> {
        let b0 = self.read_u8(pos)? as u32;
        let b1 = self.read_u8(pos + 1)? as u32;
        let b2 = self.read_u8(pos + 2)? as u32;
        Some(b0 | (b1 << 8) | (b2 << 16))
    }

    /// Signed 24-bit little-endian read (two's complement).
    pub(crate) fn read_sint24(&self, pos: DictPos) -> Option<i32> {
        let raw = self.read_u24(pos)?;
        if raw & 0x80_0000 != 0 {
            Some((raw | 0xFF00_0000) as i32)
        } else {
            Some(raw as i32)
        }
    }

    /// Read a self-relative position field: the stored signed offset is added
    /// to the field's own position; a stored 0 decodes to `NOT_A_DICT_POS`.
    pub(crate) fn read_position(&self, field_pos: DictPos) -> DictPos {
        match self.read_sint24(field_pos) {
            Some(0) | None => NOT_A_DICT_POS,
            Some(offset) => field_pos + offset,
        }
    }

    /// Overwrite a single byte in place. Only flag, probability and link
    /// patches go through here; node payloads are never rewritten.
    pub(crate) fn patch_u8(&mut self, pos: DictPos, value: u8) -> bool {
        if pos < 0 {
            return false;
        }
        match self.byte_at_mut(pos as usize) {
            Some(b) => {
                *b = value;
                true
            }
            None => {
                debug!(pos, "patch_u8 out of range");
                false
            }
        }
    }

    fn patch_u24(&mut self, pos: DictPos, value: u32) -> bool {
        for i in 0..3 {
            if !self.patch_u8(pos + i, (value >> (8 * i)) as u8) {
                return false;
            }
        }
        true
    }

    /// Patch a self-relative position field to point at `target` (absolute).
    pub(crate) fn patch_position(&mut self, field_pos: DictPos, target: DictPos) -> bool {
        let offset = if target == NOT_A_DICT_POS {
            0
        } else {
            target - field_pos
        };
        self.patch_u24(field_pos, (offset as u32) & 0xFF_FFFF)
    }

    /// Append raw bytes to the tail, returning the absolute position of the
    /// first appended byte. Fails without side effects when the appended
    /// image would outgrow the 22-bit address space.
    pub(crate) fn append(&mut self, bytes: &[u8]) -> Result<DictPos, DictError> {
        if !self.writable {
            return Err(DictError::ReadOnly);
        }
        let pos = self.len();
        if pos + bytes.len() > ADDRESS_MASK as usize {
            debug!(len = self.len(), extra = bytes.len(), "tail exceeds address space");
            return Err(DictError::OutOfSpace);
        }
        self.tail.extend_from_slice(bytes);
        Ok(pos as DictPos)
    }

    /// The full logical image (base ++ tail), for flushing.
    pub(crate) fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(self.base.as_slice());
        out.extend_from_slice(&self.tail);
        out
    }

    /// The image without the header prefix, for flushing under a rewritten
    /// header. Position fields are self-relative, so the body bytes do not
    /// depend on the header's size.
    pub(crate) fn body_from(&self, header_size: usize) -> Vec<u8> {
        let mut out = self.to_vec();
        out.drain(..header_size.min(out.len()));
        out
    }
}

/// Append-side serialization helpers, mirroring the read primitives.
pub(crate) struct ByteWriter {
    bytes: Vec<u8>,
    /// Start position the staged bytes will occupy once appended.
    start: DictPos,
}

impl ByteWriter {
    pub(crate) fn new(start: DictPos) -> Self {
        Self {
            bytes: Vec::new(),
            start,
        }
    }

    pub(crate) fn position(&self) -> DictPos {
        self.start + self.bytes.len() as DictPos
    }

    pub(crate) fn put_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub(crate) fn put_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn put_u24(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes()[..3]);
    }

    /// Write a self-relative position field pointing at `target` (absolute).
    pub(crate) fn put_position(&mut self, target: DictPos) {
        let field_pos = self.position();
        let offset = if target == NOT_A_DICT_POS {
            0
        } else {
            target - field_pos
        };
        self.put_u24((offset as u32) & 0xFF_FFFF);
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_position_round_trip() {
        let mut buffers = DictBuffers::from_owned(vec![0u8; 16], true);
        let mut w = ByteWriter::new(16);
        w.put_u8(0xAA);
        w.put_position(4); // backward reference
        w.put_position(NOT_A_DICT_POS);
        buffers.append(&w.into_bytes()).unwrap();

        assert_eq!(buffers.read_u8(16), Some(0xAA));
        assert_eq!(buffers.read_position(17), 4);
        assert_eq!(buffers.read_position(20), NOT_A_DICT_POS);
    }

    #[test]
    fn test_patch_position_in_tail() {
        let mut buffers = DictBuffers::from_owned(vec![0u8; 8], true);
        buffers.append(&[0, 0, 0]).unwrap();
        assert!(buffers.patch_position(8, 100));
        assert_eq!(buffers.read_position(8), 100);
        assert!(buffers.patch_position(8, NOT_A_DICT_POS));
        assert_eq!(buffers.read_position(8), NOT_A_DICT_POS);
    }

    #[test]
    fn test_out_of_range_reads_are_none() {
        let buffers = DictBuffers::from_owned(vec![1, 2], false);
        assert_eq!(buffers.read_u8(-1), None);
        assert_eq!(buffers.read_u16(1), None);
        assert_eq!(buffers.read_u24(0), None);
    }

    #[test]
    fn test_append_rejected_when_read_only() {
        let mut buffers = DictBuffers::from_owned(vec![0u8; 4], false);
        assert!(matches!(buffers.append(&[1]), Err(DictError::ReadOnly)));
    }
}
