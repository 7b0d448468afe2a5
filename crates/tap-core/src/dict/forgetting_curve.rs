//! Forgetting-curve aging for decaying (v4) dictionaries.
//!
//! Each terminal carries a `HistoricalInfo { level, timestamp, count }`.
//! The effective probability of an entry is a pure table lookup keyed by
//! (table id, level, elapsed time steps); nothing decays implicitly during
//! read-only queries. Durable decay only happens when the caller runs GC.

use std::sync::OnceLock;

use super::{DictHeader, MAX_PROBABILITY, NOT_A_PROBABILITY};
use crate::settings::settings;

pub const MAX_LEVEL: u8 = 3;
/// One time step of the curve: two days.
pub const DECAY_INTERVAL_SECONDS: u32 = 2 * 24 * 60 * 60;
pub const MAX_ELAPSED_TIME_STEP_COUNT: u32 = 15;
/// A level-0 entry older than this many steps may be garbage-collected.
const DISCARD_LEVEL_ZERO_ENTRY_TIME_STEP_COUNT_THRESHOLD: u32 = 14;

const TABLE_COUNT: usize = 4;
const LEVEL_COUNT: usize = MAX_LEVEL as usize + 1;
const STEP_COUNT: usize = MAX_ELAPSED_TIME_STEP_COUNT as usize + 1;

/// Historical usage record attached to a v4 terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoricalInfo {
    pub timestamp: u32,
    pub level: u8,
    pub count: u16,
}

impl HistoricalInfo {
    pub fn new(timestamp: u32, level: u8, count: u16) -> Self {
        Self {
            timestamp,
            level: level.min(MAX_LEVEL),
            count,
        }
    }
}

/// Decay table ids, ordered from slowest to fastest forgetting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayTableId {
    Weak = 0,
    Modest = 1,
    Strong = 2,
    Aggressive = 3,
}

impl DecayTableId {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "weak" => Some(Self::Weak),
            "modest" => Some(Self::Modest),
            "strong" => Some(Self::Strong),
            "aggressive" => Some(Self::Aggressive),
            _ => None,
        }
    }
}

/// Base probability a freshly-used entry of each level decodes to.
fn base_probability(level: usize) -> f64 {
    match level {
        0 => 8.0,
        1 => 64.0,
        2 => 128.0,
        _ => 192.0,
    }
}

/// How sharply elapsed time is weighted per table id.
fn table_exponent(table_id: usize) -> f64 {
    match table_id {
        0 => 0.5,
        1 => 1.0,
        2 => 1.5,
        _ => 2.0,
    }
}

struct ProbabilityTable {
    entries: [[[i32; STEP_COUNT]; LEVEL_COUNT]; TABLE_COUNT],
}

impl ProbabilityTable {
    /// Entries interpolate exponentially from a level's base probability down
    /// toward the previous level's base across the elapsed range, so the
    /// curve is continuous when GC later demotes the level.
    fn build() -> Self {
        let mut entries = [[[NOT_A_PROBABILITY; STEP_COUNT]; LEVEL_COUNT]; TABLE_COUNT];
        for (table_id, table) in entries.iter_mut().enumerate() {
            let exponent = table_exponent(table_id);
            for (level, row) in table.iter_mut().enumerate() {
                let start = base_probability(level);
                let end = if level == 0 {
                    1.0
                } else {
                    base_probability(level - 1)
                };
                for (step, slot) in row.iter_mut().enumerate() {
                    if level == 0 && step as u32 >= DISCARD_LEVEL_ZERO_ENTRY_TIME_STEP_COUNT_THRESHOLD
                    {
                        *slot = NOT_A_PROBABILITY;
                        continue;
                    }
                    let t = (step as f64 / MAX_ELAPSED_TIME_STEP_COUNT as f64).powf(exponent);
                    let p = start * (end / start).powf(t);
                    *slot = (p.round() as i32).clamp(0, MAX_PROBABILITY);
                }
            }
        }
        Self { entries }
    }

    fn get(&self, table_id: DecayTableId, level: u8, elapsed_steps: u32) -> i32 {
        let level = (level as usize).min(LEVEL_COUNT - 1);
        let step = (elapsed_steps as usize).min(STEP_COUNT - 1);
        self.entries[table_id as usize][level][step]
    }
}

fn probability_table() -> &'static ProbabilityTable {
    static TABLE: OnceLock<ProbabilityTable> = OnceLock::new();
    TABLE.get_or_init(ProbabilityTable::build)
}

fn elapsed_time_steps(timestamp: u32, now: u32) -> u32 {
    (now.saturating_sub(timestamp) / DECAY_INTERVAL_SECONDS).min(MAX_ELAPSED_TIME_STEP_COUNT)
}

fn table_id_for(header: &DictHeader) -> DecayTableId {
    header
        .decay_table_name()
        .and_then(|name| DecayTableId::from_name(&name))
        .or_else(|| DecayTableId::from_name(&settings().decay.table))
        .unwrap_or(DecayTableId::Modest)
}

/// Effective probability of a historical record at `now`.
pub fn decode_probability(info: &HistoricalInfo, now: u32, header: &DictHeader) -> i32 {
    probability_table().get(table_id_for(header), info.level, elapsed_time_steps(info.timestamp, now))
}

/// Record a fresh use: bump the level (capped), restart the clock.
pub fn create_updated_historical_info(original: Option<&HistoricalInfo>, now: u32) -> HistoricalInfo {
    match original {
        None => HistoricalInfo::new(now, 0, 1),
        Some(info) => HistoricalInfo::new(
            now,
            (info.level + 1).min(MAX_LEVEL),
            info.count.saturating_add(1),
        ),
    }
}

/// Durable decay applied when GC rewrites a terminal: one level down per
/// full elapsed step, clock restarted on demotion.
pub fn create_historical_info_to_save(info: &HistoricalInfo, now: u32) -> HistoricalInfo {
    if info.level > 0 && elapsed_time_steps(info.timestamp, now) >= 1 {
        HistoricalInfo::new(now, info.level - 1, info.count)
    } else {
        *info
    }
}

/// Whether GC must retain this entry.
pub fn needs_to_keep(info: &HistoricalInfo, now: u32) -> bool {
    !(info.level == 0
        && elapsed_time_steps(info.timestamp, now)
            >= DISCARD_LEVEL_ZERO_ENTRY_TIME_STEP_COUNT_THRESHOLD)
}

/// Whether the dictionary has outgrown its configured entry counts and the
/// caller should schedule a decaying GC.
pub fn needs_to_decay(unigram_count: u32, bigram_count: u32, header: &DictHeader) -> bool {
    unigram_count > header.max_unigram_count() || bigram_count > header.max_bigram_count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::FormatVersion;

    fn test_header() -> DictHeader {
        DictHeader::new_empty(FormatVersion::DynamicV4, "en")
    }

    #[test]
    fn test_decode_monotone_in_elapsed_time() {
        let header = test_header();
        for level in 0..=MAX_LEVEL {
            let mut last = i32::MAX;
            for step in 0..=MAX_ELAPSED_TIME_STEP_COUNT {
                let info = HistoricalInfo::new(0, level, 1);
                let p = decode_probability(&info, step * DECAY_INTERVAL_SECONDS, &header);
                if p != NOT_A_PROBABILITY {
                    assert!(p <= last, "level {level} step {step}: {p} > {last}");
                    last = p;
                }
            }
        }
    }

    #[test]
    fn test_decode_monotone_in_level() {
        let header = test_header();
        for level in 0..MAX_LEVEL {
            let low = decode_probability(&HistoricalInfo::new(0, level, 1), 0, &header);
            let high = decode_probability(&HistoricalInfo::new(0, level + 1, 1), 0, &header);
            assert!(high > low);
        }
    }

    #[test]
    fn test_update_bumps_level_and_caps() {
        let fresh = create_updated_historical_info(None, 100);
        assert_eq!((fresh.level, fresh.count), (0, 1));
        let mut info = fresh;
        for _ in 0..10 {
            info = create_updated_historical_info(Some(&info), 200);
        }
        assert_eq!(info.level, MAX_LEVEL);
        assert_eq!(info.count, 11);
    }

    #[test]
    fn test_needs_to_keep_discards_stale_level_zero() {
        let info = HistoricalInfo::new(0, 0, 1);
        assert!(needs_to_keep(&info, 0));
        let stale = 14 * DECAY_INTERVAL_SECONDS;
        assert!(!needs_to_keep(&info, stale));
        // Any level above zero is always kept.
        assert!(needs_to_keep(&HistoricalInfo::new(0, 1, 1), u32::MAX));
    }

    #[test]
    fn test_save_demotes_after_a_step() {
        let info = HistoricalInfo::new(0, 2, 5);
        let same = create_historical_info_to_save(&info, DECAY_INTERVAL_SECONDS - 1);
        assert_eq!(same.level, 2);
        let aged = create_historical_info_to_save(&info, DECAY_INTERVAL_SECONDS);
        assert_eq!(aged.level, 1);
        assert_eq!(aged.timestamp, DECAY_INTERVAL_SECONDS);
    }

    #[test]
    fn test_needs_to_decay_compares_header_maxima() {
        let header = test_header();
        assert!(!needs_to_decay(100, 100, &header));
        assert!(needs_to_decay(header.max_unigram_count() + 1, 0, &header));
        assert!(needs_to_decay(0, header.max_bigram_count() + 1, &header));
    }
}
