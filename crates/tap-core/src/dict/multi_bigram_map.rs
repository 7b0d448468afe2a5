//! Per-search cache of bigram maps for multiple previous-word contexts.
//!
//! Multi-word decoding looks up a bigram probability for every (previous,
//! next) terminal pair it scores. The first query against a previous word
//! reads its whole bigram list into a map fronted by a small bloom filter;
//! most probes miss, and the filter keeps the common negative path away
//! from the hash lookup entirely.

use std::collections::HashMap;

use super::{probability, DictPos, Dictionary};

/// Beyond this many cached previous words, queries fall through to a direct
/// list scan without caching.
const MAX_CACHED_PREV_WORDS: usize = 25;

/// 256-bit set summary with no false negatives.
#[derive(Default)]
pub(crate) struct BloomFilter {
    bits: [u64; 4],
}

impl BloomFilter {
    fn index(pos: DictPos) -> usize {
        (pos as u32 % 256) as usize
    }

    pub(crate) fn set(&mut self, pos: DictPos) {
        let i = Self::index(pos);
        self.bits[i / 64] |= 1u64 << (i % 64);
    }

    pub(crate) fn contains(&self, pos: DictPos) -> bool {
        let i = Self::index(pos);
        self.bits[i / 64] & (1u64 << (i % 64)) != 0
    }
}

struct BigramMap {
    map: HashMap<DictPos, i32>,
    filter: BloomFilter,
}

impl BigramMap {
    fn init(dict: &Dictionary, prev_pos: DictPos) -> Self {
        let mut map = HashMap::new();
        let mut filter = BloomFilter::default();
        for (target, prob) in dict.bigrams_for_terminal(prev_pos) {
            map.insert(target, prob);
            filter.set(target);
        }
        Self { map, filter }
    }

    fn get_probability(&self, next_pos: DictPos, unigram_probability: i32) -> i32 {
        if self.filter.contains(next_pos) {
            if let Some(&bigram_probability) = self.map.get(&next_pos) {
                return probability::bigram(unigram_probability, bigram_probability);
            }
        }
        probability::backoff(unigram_probability)
    }
}

/// Cache owned by one suggestion search; reset between calls.
#[derive(Default)]
pub struct MultiBigramMap {
    maps: HashMap<DictPos, BigramMap>,
}

impl MultiBigramMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probability of `next_pos` following `prev_pos`, composed with the
    /// next word's unigram probability.
    pub fn get_bigram_probability(
        &mut self,
        dict: &Dictionary,
        prev_pos: DictPos,
        next_pos: DictPos,
        unigram_probability: i32,
    ) -> i32 {
        if let Some(map) = self.maps.get(&prev_pos) {
            return map.get_probability(next_pos, unigram_probability);
        }
        if self.maps.len() < MAX_CACHED_PREV_WORDS {
            let map = BigramMap::init(dict, prev_pos);
            let result = map.get_probability(next_pos, unigram_probability);
            self.maps.insert(prev_pos, map);
            return result;
        }
        // Cache full: scan the list directly.
        for (target, prob) in dict.bigrams_for_terminal(prev_pos) {
            if target == next_pos {
                return probability::bigram(unigram_probability, prob);
            }
        }
        probability::backoff(unigram_probability)
    }

    pub fn clear(&mut self) {
        self.maps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bloom_filter_no_false_negatives() {
        let mut filter = BloomFilter::default();
        let elements: Vec<DictPos> = (0..1000).map(|i| i * 31 + 7).collect();
        for &e in elements.iter().step_by(2) {
            filter.set(e);
        }
        for &e in elements.iter().step_by(2) {
            assert!(filter.contains(e));
        }
    }

    #[test]
    fn test_bloom_filter_rejects_most_absent() {
        let mut filter = BloomFilter::default();
        filter.set(42);
        // With one element set, at most one residue class can collide.
        let hits = (0..256).filter(|&p| filter.contains(p)).count();
        assert_eq!(hits, 1);
    }
}
