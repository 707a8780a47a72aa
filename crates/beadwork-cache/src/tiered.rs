use crate::disk::DiskCache;
use crate::memory::MemoryCache;
use beadwork_graph::StatsSnapshot;
use std::sync::Arc;
use tracing::debug;

/// Two-tier result cache: in-process entry in front of the optional disk
/// sidecar. Constructor-injectable so tests can substitute a local cache
/// directory or run memory-only.
#[derive(Debug)]
pub struct ResultCache {
    memory: MemoryCache,
    disk: Option<DiskCache>,
}

impl ResultCache {
    pub fn new(memory: MemoryCache, disk: Option<DiskCache>) -> Self {
        Self { memory, disk }
    }

    /// Memory-only cache with default TTL; disk tier attached only when
    /// `BW_ROBOT` enables it.
    pub fn from_env() -> Self {
        Self::new(MemoryCache::default(), DiskCache::from_env())
    }

    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    pub fn disk(&self) -> Option<&DiskCache> {
        self.disk.as_ref()
    }

    /// Check memory first, then disk; a disk hit is promoted into the
    /// memory tier.
    pub fn get(&self, data_hash: &str, config_hash: &str) -> Option<Arc<StatsSnapshot>> {
        if let Some(snapshot) = self.memory.get(data_hash, config_hash) {
            debug!(data_hash, "analysis cache hit (memory)");
            return Some(snapshot);
        }
        let disk = self.disk.as_ref()?;
        let snapshot = Arc::new(disk.get(data_hash, config_hash)?);
        debug!(data_hash, "analysis cache hit (disk)");
        self.memory
            .set(data_hash, config_hash, Arc::clone(&snapshot));
        Some(snapshot)
    }

    /// Store in both tiers. Disk failures are logged and swallowed — the
    /// cache degrades to recompute, never to an error.
    pub fn put(&self, data_hash: &str, config_hash: &str, snapshot: Arc<StatsSnapshot>) {
        self.memory
            .set(data_hash, config_hash, Arc::clone(&snapshot));
        if let Some(disk) = &self.disk {
            if let Err(error) = disk.put(data_hash, config_hash, &snapshot) {
                debug!("disk cache write bypassed: {error}");
            }
        }
    }

    pub fn invalidate(&self) {
        self.memory.invalidate();
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(MemoryCache::default(), None)
    }
}
