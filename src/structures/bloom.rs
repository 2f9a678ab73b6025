//! Bloom Filter Module
//!
//! Probabilistic set membership with no false negatives.

use std::collections::hash_map::DefaultHasher;
use std::f64::consts::LN_2;
use std::hash::{Hash, Hasher};

use serde::Serialize;

/// False-positive rate targeted by [`BloomFilter::new`].
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;

// == Bloom Statistics ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BloomStatistics {
    /// Number of `add` calls since construction or the last `clear`
    pub item_count: usize,
    /// Size of the bit array
    pub size: usize,
    /// Number of hash probes per item
    pub hash_functions: u32,
}

// == Bloom Filter ==
/// Fixed-size bloom filter sized from an expected item count.
///
/// Bit count and probe count follow the standard sizing for `n` items at a
/// target false-positive rate `p`:
/// - `m = ceil(-n * ln(p) / ln(2)^2)`
/// - `k = round(m / n * ln(2))`, at least 1
///
/// Probe positions use double hashing (`h1 + i * h2`) over two seeded hashes.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    size: usize,
    hash_functions: u32,
    item_count: usize,
}

impl BloomFilter {
    // == Constructor ==
    /// Creates a filter for `expected_items` at a 1% false-positive target.
    pub fn new(expected_items: usize) -> Self {
        Self::with_false_positive_rate(expected_items, DEFAULT_FALSE_POSITIVE_RATE)
    }

    /// Creates a filter for `expected_items` at the given false-positive target.
    ///
    /// `expected_items` of zero is treated as one; `rate` is clamped into
    /// `[1e-9, 0.5]`.
    pub fn with_false_positive_rate(expected_items: usize, rate: f64) -> Self {
        let n = expected_items.max(1) as f64;
        let p = rate.clamp(1e-9, 0.5);

        let size = ((-n * p.ln()) / (LN_2 * LN_2)).ceil().max(64.0) as usize;
        let hash_functions = ((size as f64 / n) * LN_2).round().max(1.0) as u32;

        Self {
            bits: vec![0; size.div_ceil(64)],
            size,
            hash_functions,
            item_count: 0,
        }
    }

    // == Add ==
    pub fn add<T: Hash + ?Sized>(&mut self, item: &T) {
        for index in self.probe_indexes(item) {
            self.bits[index / 64] |= 1 << (index % 64);
        }
        self.item_count += 1;
    }

    // == Might Contain ==
    /// Returns false only if `item` was never added.
    pub fn might_contain<T: Hash + ?Sized>(&self, item: &T) -> bool {
        self.probe_indexes(item)
            .all(|index| self.bits[index / 64] & (1 << (index % 64)) != 0)
    }

    pub fn clear(&mut self) {
        self.bits.iter_mut().for_each(|word| *word = 0);
        self.item_count = 0;
    }

    pub fn statistics(&self) -> BloomStatistics {
        BloomStatistics {
            item_count: self.item_count,
            size: self.size,
            hash_functions: self.hash_functions,
        }
    }

    /// Expected false-positive rate at the current item count.
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let k = self.hash_functions as f64;
        let fill = 1.0 - (-k * self.item_count as f64 / self.size as f64).exp();
        fill.powf(k)
    }

    fn probe_indexes<T: Hash + ?Sized>(&self, item: &T) -> impl Iterator<Item = usize> {
        let h1 = seeded_hash(item, 0x51_7c_c1_b7);
        // Odd step so probes never collapse onto one bit
        let h2 = seeded_hash(item, 0x27_22_0a_95) | 1;
        let size = self.size as u64;

        (0..self.hash_functions as u64)
            .map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % size) as usize)
    }
}

fn seeded_hash<T: Hash + ?Sized>(item: &T, seed: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    item.hash(&mut hasher);
    hasher.finish()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bloom_sizing() {
        let filter = BloomFilter::new(100);
        let stats = filter.statistics();

        // 100 items at 1% needs ~959 bits and 7 probes
        assert_eq!(stats.size, 959);
        assert_eq!(stats.hash_functions, 7);
        assert_eq!(stats.item_count, 0);
    }

    #[test]
    fn test_bloom_zero_expected_items() {
        let mut filter = BloomFilter::new(0);
        filter.add("only");
        assert!(filter.might_contain("only"));
        assert!(filter.statistics().size >= 64);
    }

    #[test]
    fn test_bloom_no_false_negatives() {
        let mut filter = BloomFilter::new(100);
        let items = ["apple", "banana", "cherry", "date", "elderberry"];

        for item in items {
            filter.add(item);
        }

        for item in items {
            assert!(filter.might_contain(item), "{item} must be reported");
        }
        assert_eq!(filter.statistics().item_count, 5);
    }

    #[test]
    fn test_bloom_low_false_positives() {
        let mut filter = BloomFilter::new(100);
        for item in ["apple", "banana", "cherry", "date", "elderberry"] {
            filter.add(item);
        }

        let probes = ["fig", "grape", "honeydew", "kiwi", "lemon"];
        let false_positives = probes.iter().filter(|p| filter.might_contain(*p)).count();
        let rate = false_positives as f64 / probes.len() as f64;

        assert!(rate < 0.10, "false positive rate {rate} too high");
    }

    #[test]
    fn test_bloom_overloaded_still_no_false_negatives() {
        let mut filter = BloomFilter::new(10);
        let items: Vec<String> = (0..1_000).map(|i| format!("item-{i}")).collect();
        for item in &items {
            filter.add(item.as_str());
        }
        assert!(items.iter().all(|item| filter.might_contain(item.as_str())));
    }

    #[test]
    fn test_bloom_clear() {
        let mut filter = BloomFilter::new(50);
        filter.add("gone");
        filter.clear();

        assert!(!filter.might_contain("gone"));
        assert_eq!(filter.statistics().item_count, 0);
        assert_eq!(filter.estimated_false_positive_rate(), 0.0);
    }

    #[test]
    fn test_bloom_estimated_rate_grows_with_load() {
        let mut filter = BloomFilter::new(100);
        for i in 0..100 {
            filter.add(&i);
        }
        let at_capacity = filter.estimated_false_positive_rate();
        assert!(at_capacity > 0.005 && at_capacity < 0.02);

        for i in 100..400 {
            filter.add(&i);
        }
        assert!(filter.estimated_false_positive_rate() > at_capacity);
    }
}
