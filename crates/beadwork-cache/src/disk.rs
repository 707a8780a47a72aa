use crate::memory::CacheStats;
use beadwork_core::{is_truthy, Result};
use beadwork_graph::StatsSnapshot;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// On-disk sidecar format version; a mismatch resets the file.
pub const DISK_CACHE_VERSION: u32 = 1;
/// Maximum entries kept after LRU eviction.
pub const MAX_ENTRIES: usize = 10;
/// Entries older than this are pruned on every write.
pub const MAX_AGE_HOURS: i64 = 24;
/// Serialized entries beyond this size are never written.
pub const MAX_ENTRY_BYTES: usize = 10 * 1024 * 1024;

/// Disk cache is enabled only when this is truthy.
pub const ENV_ROBOT: &str = "BW_ROBOT";
/// Overrides the cache directory (default: user cache dir / `bv`).
pub const ENV_CACHE_DIR: &str = "BW_CACHE_DIR";

const CACHE_FILE_NAME: &str = "analysis-cache.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskEntry {
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    pub data_hash: String,
    pub config_hash: String,
    pub result: StatsSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
struct DiskFile {
    version: u32,
    entries: BTreeMap<String, DiskEntry>,
}

impl Default for DiskFile {
    fn default() -> Self {
        Self {
            version: DISK_CACHE_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

/// Optional on-disk result cache: one versioned JSON sidecar.
///
/// Every mutation runs read-modify-write under an exclusive OS file lock;
/// concurrent processes serialize on the lock, and no user-space lock is
/// held across the I/O. A corrupt or version-mismatched file is reset to
/// empty rather than surfaced as an error.
#[derive(Debug)]
pub struct DiskCache {
    path: PathBuf,
    stats: Mutex<CacheStats>,
}

impl DiskCache {
    /// Construct from the environment: enabled iff `BW_ROBOT` is truthy,
    /// rooted at `BW_CACHE_DIR` or the user cache dir under `bv`.
    pub fn from_env() -> Option<Self> {
        let enabled = std::env::var(ENV_ROBOT).is_ok_and(|v| is_truthy(&v));
        if !enabled {
            return None;
        }
        let dir = std::env::var(ENV_CACHE_DIR)
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::cache_dir().map(|d| d.join("bv")))?;
        Self::new(&dir).ok()
    }

    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(CACHE_FILE_NAME),
            stats: Mutex::new(CacheStats::default()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up an entry; a hit bumps `accessed_at` and persists the bump.
    ///
    /// All I/O failures degrade to a miss.
    pub fn get(&self, data_hash: &str, config_hash: &str) -> Option<StatsSnapshot> {
        let key = format!("{data_hash}|{config_hash}");
        let result = self.with_locked_file(|file| {
            let hit = file.entries.get_mut(&key).map(|entry| {
                entry.accessed_at = Utc::now();
                entry.result.clone()
            });
            // Persist only when the access time moved.
            Ok((hit.is_some(), hit))
        });

        let hit = result.unwrap_or_else(|error| {
            debug!("disk cache read bypassed: {error}");
            None
        });
        let mut stats = self.stats.lock();
        if hit.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        hit
    }

    /// Insert an entry, pruning stale entries and LRU-evicting down to the
    /// cap. Oversize entries are skipped silently.
    pub fn put(&self, data_hash: &str, config_hash: &str, snapshot: &StatsSnapshot) -> Result<()> {
        let key = format!("{data_hash}|{config_hash}");
        let now = Utc::now();
        let entry = DiskEntry {
            created_at: now,
            accessed_at: now,
            data_hash: data_hash.to_string(),
            config_hash: config_hash.to_string(),
            result: snapshot.clone(),
        };

        let serialized_len = serde_json::to_vec(&entry)?.len();
        if serialized_len > MAX_ENTRY_BYTES {
            debug!(
                size = serialized_len,
                limit = MAX_ENTRY_BYTES,
                "disk cache entry oversize, skipping write"
            );
            return Ok(());
        }

        let evicted = self.with_locked_file(|file| {
            file.entries.insert(key.clone(), entry);
            let evicted = prune_and_evict(&mut file.entries, now);
            Ok((true, evicted))
        })?;

        let mut stats = self.stats.lock();
        stats.evictions += evicted as u64;
        debug!(data_hash, config_hash, "disk cache entry stored");
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    /// Number of entries currently on disk.
    pub fn entry_count(&self) -> usize {
        self.with_locked_file(|file| Ok((false, file.entries.len())))
            .unwrap_or(0)
    }

    /// Open, lock, read, apply, optionally rewrite.
    ///
    /// `apply` returns `(dirty, value)`; the file is rewritten only when
    /// dirty. The exclusive lock covers the full read-modify-write.
    fn with_locked_file<T>(
        &self,
        apply: impl FnOnce(&mut DiskFile) -> Result<(bool, T)>,
    ) -> Result<T> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let outcome = (|| {
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            let mut parsed = parse_or_reset(&contents);

            let (dirty, value) = apply(&mut parsed)?;
            if dirty {
                rewrite(&mut file, &parsed)?;
            }
            Ok(value)
        })();

        let _ = fs2::FileExt::unlock(&file);
        outcome
    }
}

fn parse_or_reset(contents: &str) -> DiskFile {
    if contents.trim().is_empty() {
        return DiskFile::default();
    }
    match serde_json::from_str::<DiskFile>(contents) {
        Ok(parsed) if parsed.version == DISK_CACHE_VERSION => parsed,
        Ok(parsed) => {
            warn!(
                found = parsed.version,
                expected = DISK_CACHE_VERSION,
                "disk cache version mismatch, resetting"
            );
            DiskFile::default()
        }
        Err(error) => {
            warn!("disk cache corrupt, resetting: {error}");
            DiskFile::default()
        }
    }
}

fn rewrite(file: &mut File, parsed: &DiskFile) -> Result<()> {
    let blob = serde_json::to_vec(parsed)?;
    file.seek(SeekFrom::Start(0))?;
    file.set_len(0)?;
    file.write_all(&blob)?;
    file.sync_all()?;
    Ok(())
}

/// Drop entries older than [`MAX_AGE_HOURS`], then evict by oldest
/// `accessed_at` (ties broken key ascending) down to [`MAX_ENTRIES`].
/// Returns the number of entries removed.
fn prune_and_evict(entries: &mut BTreeMap<String, DiskEntry>, now: DateTime<Utc>) -> usize {
    let before = entries.len();
    let cutoff = now - ChronoDuration::hours(MAX_AGE_HOURS);
    entries.retain(|_, entry| entry.created_at >= cutoff);

    while entries.len() > MAX_ENTRIES {
        // BTreeMap iteration is key-ascending, so min_by_key on
        // accessed_at naturally breaks ties toward the smaller key.
        let victim = entries
            .iter()
            .min_by_key(|(key, entry)| (entry.accessed_at, (*key).clone()))
            .map(|(key, _)| key.clone());
        match victim {
            Some(key) => {
                entries.remove(&key);
            }
            None => break,
        }
    }
    before - entries.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache() -> (TempDir, DiskCache) {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path()).unwrap();
        (dir, cache)
    }

    fn snapshot(node_count: usize) -> StatsSnapshot {
        StatsSnapshot {
            node_count,
            ..Default::default()
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let (_dir, cache) = cache();
        cache.put("d1", "c1", &snapshot(3)).unwrap();
        let loaded = cache.get("d1", "c1").unwrap();
        assert_eq!(loaded.node_count, 3);
        assert!(cache.get("d1", "other").is_none());
    }

    #[test]
    fn hit_bumps_accessed_at() {
        let (_dir, cache) = cache();
        cache.put("d1", "c1", &snapshot(1)).unwrap();

        let before = std::fs::read_to_string(cache.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&before).unwrap();
        let first = parsed["entries"]["d1|c1"]["accessed_at"].clone();

        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.get("d1", "c1").unwrap();

        let after = std::fs::read_to_string(cache.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&after).unwrap();
        let second = parsed["entries"]["d1|c1"]["accessed_at"].clone();
        assert_ne!(first, second);
    }

    #[test]
    fn corrupt_file_resets_to_empty() {
        let (_dir, cache) = cache();
        cache.put("d1", "c1", &snapshot(1)).unwrap();
        std::fs::write(cache.path(), "{not json").unwrap();
        assert!(cache.get("d1", "c1").is_none());
        // A subsequent write succeeds against the reset file.
        cache.put("d2", "c2", &snapshot(2)).unwrap();
        assert!(cache.get("d2", "c2").is_some());
    }

    #[test]
    fn version_mismatch_resets() {
        let (_dir, cache) = cache();
        std::fs::write(
            cache.path(),
            r#"{"version": 99, "entries": {"d|c": {}}}"#,
        )
        .unwrap();
        assert!(cache.get("d", "c").is_none());
    }

    #[test]
    fn lru_evicts_down_to_cap() {
        let (_dir, cache) = cache();
        for i in 0..15 {
            cache.put(&format!("d{i:02}"), "c", &snapshot(i)).unwrap();
        }
        assert_eq!(cache.entry_count(), MAX_ENTRIES);
        // The earliest writes are gone, the latest survive.
        assert!(cache.get("d00", "c").is_none());
        assert!(cache.get("d14", "c").is_some());
    }

    #[test]
    fn entry_count_empty() {
        let (_dir, cache) = cache();
        assert_eq!(cache.entry_count(), 0);
    }
}
