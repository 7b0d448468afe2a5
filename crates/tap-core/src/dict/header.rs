//! Dictionary file header: magic, format version, options and a small
//! key/value attribute block (locale, decay policy, entry counts).

use std::collections::BTreeMap;

use super::{DictError, DictPos};
use crate::settings::settings;

pub(super) const MAGIC: &[u8; 4] = b"TPDX";
/// magic(4) + version(2) + header_size(2) + options(2) + attribute_count(2)
const FIXED_HEADER_SIZE: usize = 12;

const ATTR_LOCALE: &str = "locale";
const ATTR_USES_FORGETTING_CURVE: &str = "USES_FORGETTING_CURVE";
const ATTR_MAX_UNIGRAM_COUNT: &str = "MAX_UNIGRAM_COUNT";
const ATTR_MAX_BIGRAM_COUNT: &str = "MAX_BIGRAM_COUNT";
const ATTR_UNIGRAM_COUNT: &str = "UNIGRAM_COUNT";
const ATTR_BIGRAM_COUNT: &str = "BIGRAM_COUNT";
const ATTR_DECAY_TABLE: &str = "DECAY_TABLE";
const ATTR_DATE: &str = "date";

/// Structure variants, dispatched at the few call sites that differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    /// Compiled, read-only image.
    Static,
    /// Updatable trie.
    DynamicV3,
    /// Updatable trie whose terminals carry historical info for decay.
    DynamicV4,
}

impl FormatVersion {
    pub fn as_u16(self) -> u16 {
        match self {
            FormatVersion::Static => 2,
            FormatVersion::DynamicV3 => 3,
            FormatVersion::DynamicV4 => 4,
        }
    }

    fn from_u16(raw: u16) -> Result<Self, DictError> {
        match raw {
            2 => Ok(FormatVersion::Static),
            3 => Ok(FormatVersion::DynamicV3),
            4 => Ok(FormatVersion::DynamicV4),
            other => Err(DictError::UnsupportedVersion(other)),
        }
    }

    pub fn is_updatable(self) -> bool {
        !matches!(self, FormatVersion::Static)
    }

    pub fn has_historical_info(self) -> bool {
        matches!(self, FormatVersion::DynamicV4)
    }
}

#[derive(Debug, Clone)]
pub struct DictHeader {
    version: FormatVersion,
    options_flags: u16,
    /// Byte length of the header in the image this dictionary was read from.
    /// The root node array starts here.
    header_size: usize,
    attributes: BTreeMap<String, String>,
}

impl DictHeader {
    pub fn new_empty(version: FormatVersion, locale: &str) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(ATTR_LOCALE.to_string(), locale.to_string());
        if version.has_historical_info() {
            attributes.insert(ATTR_USES_FORGETTING_CURVE.to_string(), "1".to_string());
        }
        let mut header = Self {
            version,
            options_flags: 0,
            header_size: 0,
            attributes,
        };
        header.set_unigram_count(0);
        header.set_bigram_count(0);
        header.header_size = header.serialize().len();
        header
    }

    pub fn parse(data: &[u8]) -> Result<Self, DictError> {
        if data.len() < FIXED_HEADER_SIZE {
            return Err(DictError::InvalidHeader);
        }
        if &data[..4] != MAGIC {
            return Err(DictError::InvalidMagic);
        }
        let version = FormatVersion::from_u16(u16::from_le_bytes([data[4], data[5]]))?;
        let header_size = u16::from_le_bytes([data[6], data[7]]) as usize;
        let options_flags = u16::from_le_bytes([data[8], data[9]]);
        let attribute_count = u16::from_le_bytes([data[10], data[11]]) as usize;
        if header_size < FIXED_HEADER_SIZE || header_size > data.len() {
            return Err(DictError::InvalidHeader);
        }

        let mut attributes = BTreeMap::new();
        let mut pos = FIXED_HEADER_SIZE;
        for _ in 0..attribute_count {
            let key = read_string(data, header_size, &mut pos)?;
            let value = read_string(data, header_size, &mut pos)?;
            attributes.insert(key, value);
        }

        Ok(Self {
            version,
            options_flags,
            header_size,
            attributes,
        })
    }

    /// Serialize the header; `header_size` is updated to the new length so
    /// the root-array position stays consistent with what readers compute.
    pub fn serialize(&mut self) -> Vec<u8> {
        let mut body = Vec::new();
        for (key, value) in &self.attributes {
            put_string(&mut body, key);
            put_string(&mut body, value);
        }
        let total = FIXED_HEADER_SIZE + body.len();
        self.header_size = total;

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&self.version.as_u16().to_le_bytes());
        out.extend_from_slice(&(total as u16).to_le_bytes());
        out.extend_from_slice(&self.options_flags.to_le_bytes());
        out.extend_from_slice(&(self.attributes.len() as u16).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Absolute position of the root PtNode array.
    pub fn root_pos(&self) -> DictPos {
        self.header_size as DictPos
    }

    pub fn locale(&self) -> &str {
        self.attributes
            .get(ATTR_LOCALE)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn uses_forgetting_curve(&self) -> bool {
        self.attributes
            .get(ATTR_USES_FORGETTING_CURVE)
            .is_some_and(|v| v == "1")
    }

    pub fn decay_table_name(&self) -> Option<String> {
        self.attributes.get(ATTR_DECAY_TABLE).cloned()
    }

    fn count_attr(&self, key: &str) -> Option<u32> {
        self.attributes.get(key).and_then(|v| v.parse().ok())
    }

    pub fn max_unigram_count(&self) -> u32 {
        self.count_attr(ATTR_MAX_UNIGRAM_COUNT)
            .unwrap_or(settings().decay.max_unigram_count)
    }

    pub fn max_bigram_count(&self) -> u32 {
        self.count_attr(ATTR_MAX_BIGRAM_COUNT)
            .unwrap_or(settings().decay.max_bigram_count)
    }

    pub fn unigram_count(&self) -> u32 {
        self.count_attr(ATTR_UNIGRAM_COUNT).unwrap_or(0)
    }

    pub fn bigram_count(&self) -> u32 {
        self.count_attr(ATTR_BIGRAM_COUNT).unwrap_or(0)
    }

    // Counts and dates serialize zero-padded so updating them never changes
    // the header's size; node positions are assigned relative to it.

    pub fn set_unigram_count(&mut self, count: u32) {
        self.attributes
            .insert(ATTR_UNIGRAM_COUNT.to_string(), format!("{count:010}"));
    }

    pub fn set_bigram_count(&mut self, count: u32) {
        self.attributes
            .insert(ATTR_BIGRAM_COUNT.to_string(), format!("{count:010}"));
    }

    pub fn set_date(&mut self, epoch_seconds: u64) {
        self.attributes
            .insert(ATTR_DATE.to_string(), format!("{epoch_seconds:012}"));
    }

    pub fn set_attribute(&mut self, key: &str, value: &str) {
        self.attributes.insert(key.to_string(), value.to_string());
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn read_string(data: &[u8], limit: usize, pos: &mut usize) -> Result<String, DictError> {
    if *pos + 2 > limit {
        return Err(DictError::InvalidHeader);
    }
    let len = u16::from_le_bytes([data[*pos], data[*pos + 1]]) as usize;
    *pos += 2;
    if *pos + len > limit {
        return Err(DictError::InvalidHeader);
    }
    let s = std::str::from_utf8(&data[*pos..*pos + len])
        .map_err(|_| DictError::InvalidHeader)?
        .to_string();
    *pos += len;
    Ok(s)
}

fn put_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut header = DictHeader::new_empty(FormatVersion::DynamicV4, "en_US");
        header.set_unigram_count(42);
        header.set_bigram_count(7);
        let bytes = header.serialize();
        let parsed = DictHeader::parse(&bytes).unwrap();
        assert_eq!(parsed.version(), FormatVersion::DynamicV4);
        assert_eq!(parsed.locale(), "en_US");
        assert!(parsed.uses_forgetting_curve());
        assert_eq!(parsed.unigram_count(), 42);
        assert_eq!(parsed.bigram_count(), 7);
        assert_eq!(parsed.root_pos() as usize, bytes.len());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut header = DictHeader::new_empty(FormatVersion::DynamicV3, "en");
        let mut bytes = header.serialize();
        bytes[0] = b'X';
        assert!(matches!(
            DictHeader::parse(&bytes),
            Err(DictError::InvalidMagic)
        ));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut header = DictHeader::new_empty(FormatVersion::DynamicV3, "en");
        let mut bytes = header.serialize();
        bytes[4] = 9;
        assert!(matches!(
            DictHeader::parse(&bytes),
            Err(DictError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_truncated_header_is_invalid() {
        let mut header = DictHeader::new_empty(FormatVersion::DynamicV3, "en");
        let bytes = header.serialize();
        assert!(matches!(
            DictHeader::parse(&bytes[..8]),
            Err(DictError::InvalidHeader)
        ));
    }
}
