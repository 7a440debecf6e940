//! Per-fingerprint critical sections
//!
//! At most one computation runs per fingerprint; other callers for the same
//! key wait and then re-read the cache. Different keys never contend.

use crate::query::QueryFingerprint;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Slot>;

/// Lock for one fingerprint plus the number of callers holding or waiting on it
#[derive(Debug, Default)]
struct Slot {
    lock: Arc<AsyncMutex<()>>,
    users: usize,
}

/// Registry of per-fingerprint async locks
#[derive(Debug, Default, Clone)]
pub struct FingerprintLocks {
    inner: Arc<Mutex<LockMap>>,
}

/// A caller's claim on a map entry, released on drop whether or not the
/// lock was ever obtained
#[derive(Debug)]
struct Registration {
    key: String,
    locks: Arc<Mutex<LockMap>>,
}

/// Held while a fingerprint is being computed; releases on drop
#[derive(Debug)]
pub struct FingerprintGuard {
    guard: Option<OwnedMutexGuard<()>>,
    _registration: Registration,
}

impl FingerprintLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `fingerprint`
    pub async fn acquire(&self, fingerprint: &QueryFingerprint) -> FingerprintGuard {
        let key = fingerprint.as_str().to_string();
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let slot = map.entry(key.clone()).or_default();
            slot.users += 1;
            Arc::clone(&slot.lock)
        };
        let registration = Registration {
            key,
            locks: Arc::clone(&self.inner),
        };

        let guard = lock.lock_owned().await;
        FingerprintGuard {
            guard: Some(guard),
            _registration: registration,
        }
    }

    /// Number of fingerprints currently tracked
    pub fn len(&self) -> usize {
        self.inner.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = map.get_mut(&self.key) {
            slot.users = slot.users.saturating_sub(1);
            if slot.users == 0 {
                map.remove(&self.key);
            }
        }
    }
}

impl Drop for FingerprintGuard {
    fn drop(&mut self) {
        // Unlock before the registration gives up the map entry
        drop(self.guard.take());
    }
}
