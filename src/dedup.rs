//! Deduplication strategies for extracted tokens
//!
//! Both strategies are exact: a token is reported as new exactly once.
//! - Memory: one locked HashSet (simple, fine for low worker counts)
//! - Sharded: hash-partitioned HashSets for better parallel performance

use ahash::RandomState;
use clap::ValueEnum;
use hashbrown::HashSet;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Deduplication strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DedupStrategy {
    /// Single in-memory HashSet behind one lock
    Memory,
    /// HashSet split into shards, each behind its own lock
    #[default]
    Sharded,
}

/// Trait for deduplication implementations
pub trait Deduplicator: Send + Sync {
    /// Atomically check for the token and insert it.
    /// Returns true if the token had not been seen before.
    fn test_and_insert(&self, token: &str) -> bool;

    /// Number of distinct tokens seen
    fn seen(&self) -> usize;
}

// Poisoning is ignored: HashSet::insert never leaves a set half-updated.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory HashSet-based deduplicator
pub struct MemoryDeduplicator {
    set: Mutex<HashSet<String, RandomState>>,
}

impl MemoryDeduplicator {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            set: Mutex::new(HashSet::with_capacity_and_hasher(capacity, RandomState::new())),
        }
    }
}

impl Default for MemoryDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Deduplicator for MemoryDeduplicator {
    fn test_and_insert(&self, token: &str) -> bool {
        let mut set = lock(&self.set);
        if set.contains(token) {
            return false;
        }
        set.insert(token.to_owned())
    }

    fn seen(&self) -> usize {
        lock(&self.set).len()
    }
}

/// Sharded memory deduplicator for better parallel performance
pub struct ShardedDeduplicator {
    shards: Vec<Mutex<HashSet<String, RandomState>>>,
    hasher: RandomState,
}

impl ShardedDeduplicator {
    pub fn new(num_shards: usize) -> Self {
        Self::with_capacity(num_shards, 0)
    }

    pub fn with_capacity(num_shards: usize, capacity_per_shard: usize) -> Self {
        let shards = (0..num_shards.max(1))
            .map(|_| Mutex::new(HashSet::with_capacity_and_hasher(capacity_per_shard, RandomState::new())))
            .collect();

        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    fn shard_for(&self, token: &str) -> &Mutex<HashSet<String, RandomState>> {
        let mut hasher = self.hasher.build_hasher();
        token.hash(&mut hasher);
        let idx = hasher.finish() as usize % self.shards.len();
        &self.shards[idx]
    }
}

impl Deduplicator for ShardedDeduplicator {
    fn test_and_insert(&self, token: &str) -> bool {
        let mut shard = lock(self.shard_for(token));
        if shard.contains(token) {
            return false;
        }
        shard.insert(token.to_owned())
    }

    fn seen(&self) -> usize {
        self.shards.iter().map(|s| lock(s).len()).sum()
    }
}

/// Create a fresh deduplicator for one input
///
/// `expected_tokens` only pre-sizes the sets; they grow without limit.
pub fn create_deduplicator(
    strategy: DedupStrategy,
    worker_count: usize,
    expected_tokens: usize,
) -> Box<dyn Deduplicator> {
    match strategy {
        DedupStrategy::Memory => Box::new(MemoryDeduplicator::with_capacity(expected_tokens)),
        DedupStrategy::Sharded => {
            let num_shards = worker_count.max(1) * 4;
            Box::new(ShardedDeduplicator::with_capacity(
                num_shards,
                expected_tokens / num_shards,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_memory_deduplicator() {
        let dedup = MemoryDeduplicator::new();

        assert!(dedup.test_and_insert("a@x.com"));
        assert!(dedup.test_and_insert("b@x.com"));
        assert!(!dedup.test_and_insert("a@x.com"));

        assert_eq!(dedup.seen(), 2);
    }

    #[test]
    fn test_sharded_deduplicator() {
        let dedup = ShardedDeduplicator::new(4);

        assert!(dedup.test_and_insert("a@x.com"));
        assert!(dedup.test_and_insert("b@x.com"));
        assert!(dedup.test_and_insert("c@x.com"));
        assert!(!dedup.test_and_insert("a@x.com"));

        assert_eq!(dedup.seen(), 3);
    }

    #[test]
    fn test_exact_match_only() {
        let dedup = ShardedDeduplicator::new(2);

        assert!(dedup.test_and_insert("A@x.com"));
        assert!(dedup.test_and_insert("a@x.com"));
        assert!(dedup.test_and_insert("a@x.com "));
        assert!(dedup.test_and_insert(""));
        assert!(!dedup.test_and_insert(""));
    }

    #[test]
    fn test_zero_shards_clamped() {
        let dedup = ShardedDeduplicator::new(0);
        assert_eq!(dedup.num_shards(), 1);
        assert!(dedup.test_and_insert("x"));
    }

    fn hammer(dedup: Arc<dyn Deduplicator>) -> usize {
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dedup = Arc::clone(&dedup);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    for i in 0..500 {
                        if dedup.test_and_insert(&format!("user{}@x.com", i)) {
                            winners.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        winners.load(Ordering::Relaxed)
    }

    #[test]
    fn test_concurrent_inserts_report_new_once() {
        let memory = Arc::new(MemoryDeduplicator::new());
        let sharded = Arc::new(ShardedDeduplicator::new(16));

        assert_eq!(hammer(memory.clone()), 500);
        assert_eq!(hammer(sharded.clone()), 500);
        assert_eq!(memory.seen(), 500);
        assert_eq!(sharded.seen(), 500);
    }

    #[test]
    fn test_create_deduplicator() {
        for strategy in [DedupStrategy::Memory, DedupStrategy::Sharded] {
            let dedup = create_deduplicator(strategy, 4, 1000);
            assert_eq!(dedup.seen(), 0);
            assert!(dedup.test_and_insert("a"));
            assert!(!dedup.test_and_insert("a"));
            assert_eq!(dedup.seen(), 1);
        }
    }
}
