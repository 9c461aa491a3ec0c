use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// How long a cached payload stays servable after it was written.
pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Entries are only hidden once expired; the map is never trimmed on insert.
    Expiry,
    /// At most `capacity` entries; inserting past it evicts the least recently used.
    Lru { capacity: NonZeroUsize },
}

struct CacheEntry<T> {
    payload: T,
    expires_at: Instant,
    last_access: u64,
}

struct CacheInner<T> {
    entries: HashMap<String, CacheEntry<T>>,
    access_clock: u64,
}

impl<T> CacheInner<T> {
    fn tick(&mut self) -> u64 {
        self.access_clock += 1;
        self.access_clock
    }
}

/// Keyed store of the most recent successful payload per data source.
///
/// Cloning the handle shares the underlying map, so every poller given a
/// clone sees the same entries. Keys are chosen by callers and should carry
/// whatever identifies the data source (entity ids, filters).
pub struct ResultCache<T> {
    inner: Arc<Mutex<CacheInner<T>>>,
    ttl: Duration,
    policy: EvictionPolicy,
}

impl<T> Clone for ResultCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            ttl: self.ttl,
            policy: self.policy,
        }
    }
}

impl<T: Clone> Default for ResultCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ResultCache<T> {
    pub fn new() -> Self {
        Self::with_policy(DEFAULT_TTL, EvictionPolicy::Expiry)
    }

    pub fn with_policy(ttl: Duration, policy: EvictionPolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                entries: HashMap::new(),
                access_clock: 0,
            })),
            ttl,
            policy,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<T>> {
        // Payloads are replaced wholesale, so a panic mid-write cannot leave a torn entry.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the payload for `key` if present and not expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        let mut inner = self.lock();
        let stamp = inner.tick();

        let entry = inner.entries.get_mut(key)?;
        if now >= entry.expires_at {
            tracing::trace!(key, "cache entry expired");
            return None;
        }

        entry.last_access = stamp;
        Some(entry.payload.clone())
    }

    /// Stores `payload` under `key` with the cache's default TTL.
    pub fn insert(&self, key: impl Into<String>, payload: T) {
        self.insert_with_ttl(key, payload, self.ttl);
    }

    pub fn insert_with_ttl(&self, key: impl Into<String>, payload: T, ttl: Duration) {
        let key = key.into();
        let expires_at = Instant::now() + ttl;
        let mut inner = self.lock();

        if let EvictionPolicy::Lru { capacity } = self.policy {
            if !inner.entries.contains_key(&key) && inner.entries.len() >= capacity.get() {
                evict_one(&mut inner);
            }
        }

        let last_access = inner.tick();
        inner.entries.insert(
            key,
            CacheEntry {
                payload,
                expires_at,
                last_access,
            },
        );
    }

    pub fn remove(&self, key: &str) -> Option<T> {
        self.lock().entries.remove(key).map(|e| e.payload)
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.expires_at > now);
        before - inner.entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Expired entries go first; otherwise the least recently touched one.
fn evict_one<T>(inner: &mut CacheInner<T>) {
    let now = Instant::now();
    let victim = inner
        .entries
        .iter()
        .min_by_key(|(_, entry)| (entry.expires_at > now, entry.last_access))
        .map(|(key, _)| key.clone());

    if let Some(key) = victim {
        tracing::debug!(%key, "evicting cache entry");
        inner.entries.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn lru(capacity: usize) -> ResultCache<u32> {
        ResultCache::with_policy(
            DEFAULT_TTL,
            EvictionPolicy::Lru {
                capacity: NonZeroUsize::new(capacity).unwrap(),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_served_within_ttl_and_hidden_after() {
        let cache = ResultCache::new();
        cache.insert("project_42_sessions", json!({"x": 1}));

        tokio::time::advance(HOUR).await;
        assert_eq!(cache.get("project_42_sessions"), Some(json!({"x": 1})));

        tokio::time::advance(6 * HOUR).await;
        assert_eq!(cache.get("project_42_sessions"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_overwrites_and_refreshes_expiry() {
        let cache = ResultCache::new();
        cache.insert("k", 1);

        tokio::time::advance(5 * HOUR).await;
        cache.insert("k", 2);

        tokio::time::advance(5 * HOUR).await;
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_ttl_entry() {
        let cache = ResultCache::new();
        cache.insert_with_ttl("short", 7, Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(cache.get("short"), Some(7));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("short"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = ResultCache::new();
        cache.insert_with_ttl("old", 1, Duration::from_secs(1));
        cache.insert("fresh", 2);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh"), Some(2));
    }

    #[tokio::test]
    async fn test_expiry_policy_is_unbounded() {
        let cache = ResultCache::new();
        for i in 0..1000 {
            cache.insert(format!("key_{i}"), i);
        }
        assert_eq!(cache.len(), 1000);
    }

    #[tokio::test]
    async fn test_lru_evicts_least_recently_used() {
        let cache = lru(2);
        cache.insert("a", 1);
        cache.insert("b", 2);

        assert_eq!(cache.get("a"), Some(1));
        cache.insert("c", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("c"), Some(3));
    }

    #[tokio::test]
    async fn test_lru_overwrite_does_not_evict() {
        let cache = lru(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lru_prefers_expired_victim() {
        let cache = lru(2);
        cache.insert("fresh", 2);
        cache.insert_with_ttl("stale", 1, Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;

        // "stale" is the most recently written, recency alone would keep it
        cache.insert("new", 3);

        assert_eq!(cache.get("fresh"), Some(2));
        assert_eq!(cache.get("new"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache = ResultCache::new();
        let other = cache.clone();

        cache.insert("shared", "payload".to_string());
        assert_eq!(other.get("shared").as_deref(), Some("payload"));

        other.remove("shared");
        assert!(cache.is_empty());
    }
}
