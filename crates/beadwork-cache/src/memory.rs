use beadwork_graph::StatsSnapshot;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default in-process TTL.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Counters shared by both cache tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

#[derive(Debug)]
struct StoredEntry {
    key: String,
    snapshot: Arc<StatsSnapshot>,
    stored_at: Instant,
}

/// Single-entry in-process result cache.
///
/// Keyed by `data_hash|config_hash`; a read hits only when the key matches
/// and the entry is younger than the TTL. Set overwrites unconditionally.
/// Hash computation always happens before the lock is touched — both
/// operations take pre-computed hashes.
#[derive(Debug)]
pub struct MemoryCache {
    entry: RwLock<Option<StoredEntry>>,
    ttl: Duration,
    stats: Mutex<CacheStats>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            ttl,
            stats: Mutex::new(CacheStats::default()),
        }
    }

    pub fn cache_key(data_hash: &str, config_hash: &str) -> String {
        format!("{data_hash}|{config_hash}")
    }

    pub fn get(&self, data_hash: &str, config_hash: &str) -> Option<Arc<StatsSnapshot>> {
        let key = Self::cache_key(data_hash, config_hash);
        let guard = self.entry.read();
        let hit = guard
            .as_ref()
            .filter(|stored| stored.key == key && stored.stored_at.elapsed() < self.ttl)
            .map(|stored| Arc::clone(&stored.snapshot));
        drop(guard);

        let mut stats = self.stats.lock();
        if hit.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        hit
    }

    pub fn set(&self, data_hash: &str, config_hash: &str, snapshot: Arc<StatsSnapshot>) {
        let key = Self::cache_key(data_hash, config_hash);
        let mut guard = self.entry.write();
        if guard.as_ref().is_some_and(|stored| stored.key != key) {
            self.stats.lock().evictions += 1;
        }
        *guard = Some(StoredEntry {
            key,
            snapshot,
            stored_at: Instant::now(),
        });
        debug!(data_hash, config_hash, "memory cache entry stored");
    }

    pub fn invalidate(&self) {
        let mut guard = self.entry.write();
        if guard.take().is_some() {
            self.stats.lock().evictions += 1;
        }
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = *self.stats.lock();
        stats.entries = usize::from(self.entry.read().is_some());
        stats
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
