//! In-memory TTL cache with a capacity bound and a background sweeper.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::config::MAX_CACHE_TTL_SECS;

/// Shortest interval the sweeper will tick at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    pub cached_at: DateTime<Utc>,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub ttl_secs: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Key/value store used by the clinical service.
pub trait CacheStore<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheEntry<V>>;
    fn set(&self, key: &str, value: V);
    fn evict(&self, key: &str) -> bool;
    /// Drop every expired entry, returning how many were removed.
    fn purge_expired(&self) -> usize;
    fn len(&self) -> usize;
    fn clear(&self);
    fn stats(&self) -> CacheStats;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Inner<V> {
    entries: IndexMap<String, CacheEntry<V>>,
    hits: u64,
    misses: u64,
}

/// Insertion-ordered map; the oldest key is evicted when full.
pub struct MemoryCache<V> {
    inner: Mutex<Inner<V>>,
    ttl: Duration,
    max_entries: usize,
}

impl<V: Clone + Send> MemoryCache<V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: IndexMap::new(),
                hits: 0,
                misses: 0,
            }),
            ttl: ttl.min(Duration::from_secs(MAX_CACHE_TTL_SECS)),
            max_entries: max_entries.max(1),
        }
    }

    // Entries are replaced whole, so a poisoned map is still usable.
    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<V: Clone + Send> CacheStore<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        let mut inner = self.lock();
        let now = Instant::now();
        let lookup = inner
            .entries
            .get(key)
            .map(|entry| (!entry.is_expired(now)).then(|| entry.clone()));
        match lookup {
            Some(Some(entry)) => {
                inner.hits += 1;
                Some(entry)
            }
            Some(None) => {
                inner.entries.shift_remove(key);
                inner.misses += 1;
                None
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    fn set(&self, key: &str, value: V) {
        let mut inner = self.lock();
        let now = Instant::now();
        let entry = CacheEntry {
            data: value,
            cached_at: Utc::now(),
            // ttl is clamped in `new`, so this only fails on a broken clock.
            expires_at: now.checked_add(self.ttl).unwrap_or(now),
        };

        if let Some(existing) = inner.entries.get_mut(key) {
            *existing = entry;
            return;
        }

        while inner.entries.len() >= self.max_entries {
            match inner.entries.shift_remove_index(0) {
                Some((oldest, _)) => {
                    tracing::debug!(key = %oldest, "Cache full, evicted oldest entry");
                }
                None => break,
            }
        }
        inner.entries.insert(key.to_string(), entry);
    }

    fn evict(&self, key: &str) -> bool {
        self.lock().entries.shift_remove(key).is_some()
    }

    fn purge_expired(&self) -> usize {
        let mut inner = self.lock();
        let now = Instant::now();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired(now));
        before - inner.entries.len()
    }

    fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entries: inner.entries.len(),
            max_entries: self.max_entries,
            ttl_secs: self.ttl.as_secs(),
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}

/// Type-erased view of a cache for the sweeper.
pub trait Sweepable: Send + Sync {
    fn sweep(&self) -> usize;
}

impl<V: Clone + Send> Sweepable for MemoryCache<V> {
    fn sweep(&self) -> usize {
        self.purge_expired()
    }
}

/// Handle to a running sweeper task. Dropping it stops the task.
pub struct SweeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl SweeperHandle {
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Cache sweeper task failed");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Periodically purge expired entries from every cache in `caches`.
/// `every` is raised to [`MIN_SWEEP_INTERVAL`] if shorter.
pub fn spawn_sweeper(caches: Vec<Arc<dyn Sweepable>>, every: Duration) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let every = every.max(MIN_SWEEP_INTERVAL);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed: usize = caches.iter().map(|c| c.sweep()).sum();
                    if removed > 0 {
                        tracing::info!(removed, "Purged expired cache entries");
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Cache sweeper stopped");
                    break;
                }
            }
        }
    });

    SweeperHandle {
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_evicts_oldest_inserted() {
        let cache = MemoryCache::new(Duration::from_secs(60), 2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b").unwrap().data, 2);
        assert_eq!(cache.get("c").unwrap().data, 3);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn overwrite_keeps_insertion_position() {
        let cache = MemoryCache::new(Duration::from_secs(60), 2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);
        cache.set("c", 3);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b").unwrap().data, 2);
    }

    #[test]
    fn expired_entries_are_removed_on_get() {
        let cache = MemoryCache::new(Duration::ZERO, 10);
        cache.set("a", 1);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn purge_counts_removed_entries() {
        let cache = MemoryCache::new(Duration::ZERO, 10);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let cache = MemoryCache::new(Duration::from_secs(60), 5);
        cache.set("a", "x".to_string());
        cache.get("a");
        cache.get("missing");
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.max_entries, 5);

        cache.clear();
        assert_eq!(cache.stats().hits, 0);
        assert!(!cache.evict("a"));
    }

    #[tokio::test]
    async fn sweeper_waits_a_full_interval_and_shuts_down() {
        let cache = Arc::new(MemoryCache::new(Duration::ZERO, 10));
        cache.set("a", 1);
        let handle = spawn_sweeper(
            vec![cache.clone() as Arc<dyn Sweepable>],
            Duration::from_secs(60),
        );
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.len(), 1);
        handle.shutdown().await;
    }

    #[test]
    fn oversized_ttl_is_clamped() {
        let cache = MemoryCache::new(Duration::MAX, 10);
        cache.set("a", 1);
        assert_eq!(cache.get("a").unwrap().data, 1);
        assert_eq!(cache.stats().ttl_secs, MAX_CACHE_TTL_SECS);
    }

    #[tokio::test]
    async fn zero_interval_sweeper_still_runs() {
        let cache = Arc::new(MemoryCache::new(Duration::ZERO, 10));
        cache.set("a", 1);
        let handle = spawn_sweeper(vec![cache.clone() as Arc<dyn Sweepable>], Duration::ZERO);
        tokio::time::sleep(MIN_SWEEP_INTERVAL + Duration::from_millis(300)).await;
        assert_eq!(cache.len(), 0);
        handle.shutdown().await;
    }
}
