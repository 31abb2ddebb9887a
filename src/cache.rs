//! Shared TTL cache used by the category classifier
//!
//! The cache is an acceleration layer, never the source of truth: reads and
//! writes are independent key-value operations, concurrent writers race with
//! last-write-wins semantics, and expiry is passive. Values are JSON strings.

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

/// Async key-value store with per-key expiry.
///
/// `set` reports success as a bool instead of an error; cache failures must
/// never break classification.
#[async_trait]
pub trait TtlCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> bool;
}

#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

struct PerEntryExpiry;

impl Expiry<String, Entry> for PerEntryExpiry {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-memory TTL cache backed by moka.
///
/// The per-entry TTL comes from the value itself, so one cache holds the
/// 90-day vendor patterns, 180-day user corrections, and 30-day weakened
/// global patterns side by side.
pub struct MemoryTtlCache {
    cache: Cache<String, Entry>,
}

impl MemoryTtlCache {
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryExpiry)
            .build();
        Self { cache }
    }
}

impl Default for MemoryTtlCache {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl TtlCache for MemoryTtlCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).await.map(|e| e.value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> bool {
        self.cache
            .insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    ttl,
                },
            )
            .await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = MemoryTtlCache::default();
        assert!(cache.set("k", "v", Duration::from_secs(60)).await);
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let cache = MemoryTtlCache::default();
        assert_eq!(cache.get("absent").await, None);
    }

    #[tokio::test]
    async fn later_write_wins() {
        let cache = MemoryTtlCache::default();
        cache.set("k", "first", Duration::from_secs(60)).await;
        cache.set("k", "second", Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("second"));
    }
}
