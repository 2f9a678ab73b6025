//! Data Structures Module
//!
//! Self-contained building blocks used by the cache engine and the sync
//! orchestrator: prefix trie, LRU cache, bloom filter, priority queue and
//! string matching helpers.

mod bloom;
mod lru;
pub mod matcher;
mod priority_queue;
mod trie;


// Re-export public types
pub use bloom::{BloomFilter, BloomStatistics, DEFAULT_FALSE_POSITIVE_RATE};
pub use lru::{LruCache, LruStatistics};
pub use priority_queue::PriorityQueue;
pub use trie::Trie;
