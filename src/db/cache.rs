use std::fmt::Display;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::RwLock;

use crate::models::Recommendation;

/// Memoization key for a recommendation list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecommendationKey {
    pub base_id: i32,
    pub limit: u32,
}

impl RecommendationKey {
    pub fn new(base_id: i32, limit: u32) -> Self {
        Self { base_id, limit }
    }
}

impl Display for RecommendationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "recs:{}:{}", self.base_id, self.limit)
    }
}

struct CacheEntry {
    value: Arc<Vec<Recommendation>>,
    inserted_at: Instant,
}

/// Bounded, TTL-governed store of shaped recommendation lists
///
/// Reads take the shared lock and use `peek`. A hit then promotes the key if
/// the write lock is free at that moment, so eviction order is approximate
/// LRU. Expired entries are dropped lazily.
#[derive(Clone)]
pub struct RecommendationCache {
    entries: Arc<RwLock<LruCache<RecommendationKey, CacheEntry>>>,
    ttl: Duration,
}

impl RecommendationCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(LruCache::new(capacity))),
            ttl,
        }
    }

    /// Returns the cached list if present and younger than the TTL
    pub async fn get(&self, key: &RecommendationKey) -> Option<Arc<Vec<Recommendation>>> {
        self.get_at(key, Instant::now()).await
    }

    async fn get_at(
        &self,
        key: &RecommendationKey,
        now: Instant,
    ) -> Option<Arc<Vec<Recommendation>>> {
        let fresh = {
            let entries = self.entries.read().await;
            match entries.peek(key) {
                Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                    Some(entry.value.clone())
                }
                Some(_) => None,
                None => return None,
            }
        };

        if let Some(value) = fresh {
            // Contended hits skip the recency bump
            if let Ok(mut entries) = self.entries.try_write() {
                entries.promote(key);
            }
            return Some(value);
        }

        // Expired: re-check under the write lock, a fresh put may have landed
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.peek(key) {
            if now.duration_since(entry.inserted_at) >= self.ttl {
                entries.pop(key);
                tracing::debug!(key = %key, "Evicted expired recommendation entry");
            }
        }
        None
    }

    /// Stores a list; the last write for a key wins
    pub async fn put(&self, key: RecommendationKey, value: Arc<Vec<Recommendation>>) {
        self.put_at(key, value, Instant::now()).await;
    }

    async fn put_at(&self, key: RecommendationKey, value: Arc<Vec<Recommendation>>, now: Instant) {
        let mut entries = self.entries.write().await;
        entries.put(
            key,
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
