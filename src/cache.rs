//! Session-scoped response cache keyed by request URL

use crate::constants::CACHE_TTL_SECS;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// A decoded payload together with the moment it was stored
#[derive(Debug, Clone)]
pub struct CachedResponse<T> {
    /// The stored payload
    pub payload: T,

    /// When the payload was stored
    pub stored_at: Instant,
}

impl<T> CachedResponse<T> {
    /// Wraps a payload stamped with the current time
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            stored_at: Instant::now(),
        }
    }

    /// Time elapsed since the payload was stored
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.stored_at)
    }

    /// Check if the entry is younger than the freshness window
    pub fn is_fresh(&self, window: Duration) -> bool {
        self.age() < window
    }
}

/// Type alias for the entry map (request URL -> cached JSON document)
type EntryMap = HashMap<String, CachedResponse<Value>>;

/// In-memory response cache for one dashboard session
///
/// Entries older than the freshness window are ignored on read but kept
/// until the next successful fetch of the same key overwrites them. The
/// key space is a handful of endpoint/parameter combinations, so there is
/// no eviction.
#[derive(Debug)]
pub struct ResponseCache {
    entries: Arc<RwLock<EntryMap>>,
    freshness: Duration,
}

impl ResponseCache {
    /// Creates a cache with the default 60 second freshness window
    pub fn new() -> Self {
        Self::with_freshness(Duration::from_secs(CACHE_TTL_SECS))
    }

    /// Creates a cache with a custom freshness window
    pub fn with_freshness(freshness: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            freshness,
        }
    }

    /// The freshness window applied on read
    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Returns the stored payload for `key` if it is still fresh
    pub async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;

        if !entry.is_fresh(self.freshness) {
            tracing::trace!(key, age_ms = entry.age().as_millis() as u64, "Cache entry stale");
            return None;
        }

        Some(entry.payload.clone())
    }

    /// Stores `payload` under `key`, replacing any previous entry
    pub async fn put(&self, key: &str, payload: Value) {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), CachedResponse::new(payload));
        tracing::trace!(key, "Cache entry stored");
    }

    /// Age of the entry for `key`, fresh or not
    pub async fn age(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.read().await;
        entries.get(key).map(CachedResponse::age)
    }

    /// True if an entry exists for `key`, regardless of freshness
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// Number of stored entries, stale ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops every entry, ending the session
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}
