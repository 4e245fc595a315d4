use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;

use super::{
    CacheConfig, CacheEntry, CacheKey, CachePayload, CacheStats, Clock, RouteCache, SystemClock,
};

/// In-process cache guarded by a single mutex.
///
/// Contents are lost when the value is dropped. Useful for tests and for
/// one-shot CLI runs that should not touch disk.
#[derive(Debug)]
pub struct MemoryRouteCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl MemoryRouteCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
            clock,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryRouteCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl RouteCache for MemoryRouteCache {
    fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let now = self.clock.now();
        let cutoff = now - self.config.ttl;
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            return Ok(None);
        };
        if entry.created_at < cutoff {
            return Ok(None);
        }
        entry.access_count += 1;
        entry.cache_hit_count += 1;
        entry.last_accessed_at = now;
        Ok(Some(entry.clone()))
    }

    fn store(&self, key: &CacheKey, payload: CachePayload) -> Result<()> {
        let now = self.clock.now();
        let mut entries = self.entries();
        match entries.get_mut(key) {
            Some(entry) => {
                entry.payload = payload;
                entry.created_at = now;
                entry.last_accessed_at = now;
                entry.access_count += 1;
            }
            None => {
                entries.insert(
                    key.clone(),
                    CacheEntry {
                        key: key.clone(),
                        payload,
                        created_at: now,
                        last_accessed_at: now,
                        access_count: 1,
                        cache_hit_count: 0,
                    },
                );
            }
        }
        Ok(())
    }

    fn evict_expired(&self) -> Result<usize> {
        let cutoff = self.clock.now() - self.config.ttl;
        let floor = self.config.min_access_count;
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at >= cutoff || entry.access_count >= floor);
        Ok(before - entries.len())
    }

    fn stats(&self) -> Result<CacheStats> {
        let cutoff = self.clock.now() - self.config.ttl;
        let entries = self.entries();
        let accesses = entries.values().map(|entry| entry.access_count).sum();
        let hits = entries.values().map(|entry| entry.cache_hit_count).sum();
        let latest = entries.values().map(|entry| entry.created_at).max();
        let recent = entries
            .values()
            .filter(|entry| entry.created_at >= cutoff)
            .count();
        Ok(CacheStats::from_totals(entries.len() as u64, accesses, hits)
            .with_recency(latest, recent as u64))
    }
}
