//! In-process response cache

use super::store::{CacheEntry, CacheStats, ResponseCache};
use crate::error::{DocQueryError, Result};
use crate::query::QueryFingerprint;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// In-memory cache; contents are lost when the process exits
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<QueryFingerprint, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<QueryFingerprint, CacheEntry>>> {
        self.entries
            .read()
            .map_err(|_| DocQueryError::Cache("memory cache lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<QueryFingerprint, CacheEntry>>> {
        self.entries
            .write()
            .map_err(|_| DocQueryError::Cache("memory cache lock poisoned".to_string()))
    }
}

impl ResponseCache for MemoryCacheStore {
    fn get(&self, fingerprint: &QueryFingerprint) -> Result<Option<CacheEntry>> {
        Ok(self.read()?.get(fingerprint).cloned())
    }

    fn put(&self, entry: &CacheEntry) -> Result<()> {
        self.write()?
            .insert(entry.fingerprint.clone(), entry.clone());
        Ok(())
    }

    fn evict_older_than(&self, age: Duration) -> Result<usize> {
        let now = Utc::now();
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_older_than(age, now));
        Ok(before - entries.len())
    }

    fn stats(&self) -> Result<CacheStats> {
        let entries = self.read()?;
        Ok(CacheStats {
            total_entries: entries.len(),
            degraded_entries: entries.values().filter(|e| e.degraded).count(),
            total_token_cost: entries.values().map(|e| e.token_cost).sum(),
            oldest: entries.values().map(|e| e.created_at).min(),
            newest: entries.values().map(|e| e.created_at).max(),
        })
    }

    fn clear(&self) -> Result<usize> {
        let mut entries = self.write()?;
        let count = entries.len();
        entries.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ResponsePayload;

    fn entry(key: &str, text: &str) -> CacheEntry {
        CacheEntry::new(
            QueryFingerprint::from_hex(key),
            ResponsePayload::PlainText(text.to_string()),
            "model",
            10,
            false,
        )
    }

    #[test]
    fn test_cache_basic() {
        let cache = MemoryCacheStore::new();
        cache.put(&entry("k1", "v1")).unwrap();

        let hit = cache.get(&QueryFingerprint::from_hex("k1")).unwrap().unwrap();
        assert_eq!(hit.response_payload, ResponsePayload::PlainText("v1".into()));
        assert!(cache.get(&QueryFingerprint::from_hex("k2")).unwrap().is_none());
    }

    #[test]
    fn test_put_replaces() {
        let cache = MemoryCacheStore::new();
        cache.put(&entry("k1", "old")).unwrap();
        cache.put(&entry("k1", "new")).unwrap();

        let hit = cache.get(&QueryFingerprint::from_hex("k1")).unwrap().unwrap();
        assert_eq!(hit.response_payload, ResponsePayload::PlainText("new".into()));
        assert_eq!(cache.stats().unwrap().total_entries, 1);
    }

    #[test]
    fn test_evict_older_than() {
        let cache = MemoryCacheStore::new();
        assert_eq!(cache.evict_older_than(Duration::from_secs(1)).unwrap(), 0);

        let mut stale = entry("old", "x");
        stale.created_at = Utc::now() - chrono::Duration::hours(2);
        cache.put(&stale).unwrap();
        cache.put(&entry("fresh", "y")).unwrap();

        assert_eq!(cache.evict_older_than(Duration::from_secs(3600)).unwrap(), 1);
        assert!(cache.get(&QueryFingerprint::from_hex("old")).unwrap().is_none());
        assert!(cache.get(&QueryFingerprint::from_hex("fresh")).unwrap().is_some());
    }

    #[test]
    fn test_stats_and_clear() {
        let cache = MemoryCacheStore::new();
        let mut degraded = entry("a", "x");
        degraded.degraded = true;
        cache.put(&degraded).unwrap();
        cache.put(&entry("b", "y")).unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.degraded_entries, 1);
        assert_eq!(stats.total_token_cost, 20);

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.stats().unwrap(), CacheStats::default());
    }
}
