//! # Result Cache
//!
//! Maps a lookup key (`schedule:2024`, `standings:current`, ...) to the last
//! payload fetched for it. Entries are never evicted; once their TTL has
//! elapsed they are simply treated as absent.
//!
//! Timestamps come from `tokio::time::Instant`, so a paused test clock can
//! step across the TTL without sleeping.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::RawRecord;

/// Freshness window for cached lookups, measured from insertion.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// A cached payload and the moment it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub timestamp: Instant,
    pub data: RawRecord,
}

/// Single-owner TTL cache. Wrap it in a mutex if several tasks share it.
#[derive(Debug)]
pub struct ResultCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a copy of the payload for `key` if it is still fresh.
    pub fn get(&self, key: &str) -> Option<RawRecord> {
        self.entries
            .get(key)
            .filter(|entry| entry.timestamp.elapsed() < self.ttl)
            .map(|entry| entry.data.clone())
    }

    /// Stores `data` under `key`, replacing any previous entry and restarting its TTL.
    pub fn put(&mut self, key: &str, data: RawRecord) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                timestamp: Instant::now(),
                data,
            },
        );
    }

    /// Number of physically retained entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
