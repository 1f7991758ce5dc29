//! Thread-safe deduplication store of visited targets
//!
//! The visited set is the single busiest shared structure in the crawl,
//! so it is sharded: each target hashes to one of a fixed number of
//! independently locked sets. `try_mark` is the sole authoritative dedup
//! gate; `contains` exists only as a cheap pre-enqueue filter.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

const SHARD_COUNT: usize = 16;

/// Sharded set of target identifiers; grows monotonically over a run
pub struct VisitedSet {
    shards: Vec<Mutex<HashSet<String>>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT)
                .map(|_| Mutex::new(HashSet::new()))
                .collect(),
        }
    }

    fn shard_for(&self, target: &str) -> &Mutex<HashSet<String>> {
        let mut hasher = DefaultHasher::new();
        target.hash(&mut hasher);
        &self.shards[hasher.finish() as usize % SHARD_COUNT]
    }

    /// Atomically records the target; returns true iff it was new
    ///
    /// Check-and-insert happens under one shard lock, so two workers
    /// racing on the same target see exactly one `true`.
    pub fn try_mark(&self, target: &str) -> bool {
        self.shard_for(target)
            .lock()
            .unwrap()
            .insert(target.to_string())
    }

    /// Non-authoritative membership check for pre-enqueue filtering
    pub fn contains(&self, target: &str) -> bool {
        self.shard_for(target).lock().unwrap().contains(target)
    }

    /// Count of distinct targets marked so far
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().unwrap().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for VisitedSet {
    fn default() -> Self {
        Self::new()
    }
}
