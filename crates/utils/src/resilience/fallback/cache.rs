//! TTL cache of earlier analysis results, used to feed degraded analyses.

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use pipewright_core::constants::DEFAULT_CACHE_TTL;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// A cached analysis payload
#[derive(Debug, Clone)]
pub struct CachedEntry<T> {
    pub key: String,
    pub payload: T,
    /// Wall-clock time the entry was stored, for user-facing warnings
    pub cached_at: DateTime<Utc>,
    stored_at: Instant,
}

impl<T> CachedEntry<T> {
    fn new(key: String, payload: T) -> Self {
        Self {
            key,
            payload,
            cached_at: Utc::now(),
            stored_at: Instant::now(),
        }
    }

    /// Time since the entry was stored, on the monotonic clock
    #[must_use]
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.stored_at)
    }

    #[must_use]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }
}

/// Snapshot of the cache contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub stale_entries: usize,
    pub ttl: Duration,
    pub oldest_entry: Option<DateTime<Utc>>,
}

/// Keyed cache whose entries expire after a fixed TTL.
///
/// Expiry is lazy: a stale entry stays in the map until a lookup for its key
/// finds it and evicts it. There is no background sweep.
#[derive(Debug)]
pub struct AnalysisCache<T> {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedEntry<T>>>,
}

impl<T: Clone> AnalysisCache<T> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, evicting it instead if it has expired
    pub fn get(&self, key: &str) -> Option<CachedEntry<T>> {
        let entries = self.entries.upgradable_read();
        let age = match entries.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired(self.ttl) => return Some(entry.clone()),
            Some(entry) => entry.age(),
        };

        debug!(key, age = ?age, "evicting stale cache entry");
        let mut entries = RwLockUpgradableReadGuard::upgrade(entries);
        entries.remove(key);
        None
    }

    /// Store `payload` under `key`, replacing any earlier entry whole
    pub fn insert(&self, key: impl Into<String>, payload: T) {
        let key = key.into();
        let entry = CachedEntry::new(key.clone(), payload);
        self.entries.write().insert(key, entry);
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Drop every entry, returning how many there were
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let stale_entries = entries
            .values()
            .filter(|entry| entry.is_expired(self.ttl))
            .count();

        CacheStats {
            total_entries: entries.len(),
            fresh_entries: entries.len() - stale_entries,
            stale_entries,
            ttl: self.ttl,
            oldest_entry: entries.values().map(|entry| entry.cached_at).min(),
        }
    }
}

impl<T: Clone> Default for AnalysisCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
