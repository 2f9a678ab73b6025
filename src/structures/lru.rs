//! LRU Cache Module
//!
//! Fixed-capacity key-value cache with least-recently-used eviction.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use serde::Serialize;

// == LRU Statistics ==
/// Snapshot of an [`LruCache`]'s accounting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LruStatistics {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: usize,
    pub capacity: usize,
}

#[derive(Debug)]
struct Slot<V> {
    value: V,
    rank: u64,
}

// == LRU Cache ==
/// Bounded cache that evicts the least recently used entry on overflow.
///
/// Every entry carries a recency rank drawn from a monotonically increasing
/// clock. `order` indexes entries by rank, so:
/// - First entry of `order` = least recently used
/// - Last entry of `order` = most recently used
#[derive(Debug)]
pub struct LruCache<K, V> {
    entries: HashMap<K, Slot<V>>,
    order: BTreeMap<u64, K>,
    capacity: usize,
    clock: u64,
    hits: u64,
    misses: u64,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an empty cache holding at most `capacity` entries.
    ///
    /// A capacity of zero is clamped to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            capacity: capacity.max(1),
            clock: 0,
            hits: 0,
            misses: 0,
        }
    }

    // == Put ==
    /// Inserts or overwrites `key`, marking it most recently used.
    ///
    /// # Returns
    /// The evicted entry when inserting a new key into a full cache.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        let rank = self.tick();

        if let Some(slot) = self.entries.get_mut(&key) {
            self.order.remove(&slot.rank);
            slot.value = value;
            slot.rank = rank;
            self.order.insert(rank, key);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.pop_lru()
        } else {
            None
        };

        self.order.insert(rank, key.clone());
        self.entries.insert(key, Slot { value, rank });
        evicted
    }

    // == Get ==
    /// Looks up `key`, promoting it to most recently used on a hit.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if !self.entries.contains_key(key) {
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        let rank = self.tick();
        let slot = self.entries.get_mut(key)?;
        if let Some(owned_key) = self.order.remove(&slot.rank) {
            self.order.insert(rank, owned_key);
        }
        slot.rank = rank;
        Some(&slot.value)
    }

    // == Peek ==
    /// Looks up `key` without touching recency or hit/miss counters.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|slot| &slot.value)
    }

    // == Remove ==
    /// Removes `key`, returning its value if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.rank);
        Some(slot.value)
    }

    // == Pop LRU ==
    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let (_, key) = self.order.pop_first()?;
        let slot = self.entries.remove(&key)?;
        Some((key, slot.value))
    }

    // == Retain ==
    /// Keeps only the entries for which `keep` returns true.
    ///
    /// Returns the removed entries, least recently used first.
    pub fn retain<F>(&mut self, mut keep: F) -> Vec<(K, V)>
    where
        F: FnMut(&K, &V) -> bool,
    {
        let doomed: Vec<(u64, K)> = self
            .order
            .iter()
            .filter(|(_, key)| {
                self.entries
                    .get(*key)
                    .is_some_and(|slot| !keep(*key, &slot.value))
            })
            .map(|(rank, key)| (*rank, key.clone()))
            .collect();

        doomed
            .into_iter()
            .filter_map(|(rank, key)| {
                self.order.remove(&rank);
                self.entries.remove(&key).map(|slot| (key, slot.value))
            })
            .collect()
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.values()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Drops every entry. Hit/miss counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Statistics ==
    /// Returns hit/miss accounting and occupancy.
    pub fn statistics(&self) -> LruStatistics {
        let total = self.hits + self.misses;
        LruStatistics {
            hits: self.hits,
            misses: self.misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                self.hits as f64 / total as f64
            },
            size: self.entries.len(),
            capacity: self.capacity,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}
