//! In-memory query cache using moka
//!
//! Values are stored as JSON so one cache can hold any serializable type.
//! Entries expire after the configured TTL and are never refreshed in the
//! background; writers invalidate by key or glob pattern. Every invalidation
//! bumps a generation counter so a load that raced with a write is returned
//! to its caller but not cached.

use anyhow::{Context, Result};
use moka::future::Cache;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_MAX_CAPACITY: u64 = 1_000;
const DEFAULT_TTL: Duration = Duration::from_secs(3600);

pub struct MemoryCache {
    cache: Cache<String, Arc<String>>,
    ttl: Duration,
    generation: AtomicU64,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(DEFAULT_MAX_CAPACITY, DEFAULT_TTL)
    }

    pub fn with_capacity_and_ttl(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            ttl,
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Approximate number of live entries
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(json) => Ok(Some(
                serde_json::from_str(&json).context("Failed to deserialize cache value")?,
            )),
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        self.cache.insert(key.to_string(), Arc::new(json)).await;
        Ok(())
    }

    /// Return the cached value for `key`, or run `load`, cache and return its result.
    ///
    /// Loader errors are passed through and nothing is cached. A value that
    /// fails to (de)serialize, or whose load overlapped an invalidation, is
    /// served uncached.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.get::<T>(key).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(e) => tracing::warn!(key, "Discarding unreadable cache entry: {}", e),
        }

        let started = self.generation.load(Ordering::Acquire);
        let value = load().await?;
        if self.generation.load(Ordering::Acquire) != started {
            tracing::debug!(key, "Skipping cache fill after concurrent invalidation");
            return Ok(value);
        }
        if let Err(e) = self.set(key, &value).await {
            tracing::warn!(key, "Failed to cache value: {}", e);
        }
        Ok(value)
    }

    pub async fn delete(&self, key: &str) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.invalidate(key).await;
    }

    /// Invalidate every key matching a glob (`*` any run, `?` one char)
    pub async fn delete_pattern(&self, pattern: &str) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| glob_match(pattern, key.as_str()))
            .map(|(key, _)| (*key).clone())
            .collect();

        for key in keys {
            self.cache.invalidate(&key).await;
        }
    }

    pub async fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterative glob matcher with single-star backtracking
fn glob_match(pattern: &str, key: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let k: Vec<char> = key.chars().collect();
    let (mut pi, mut ki) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ki < k.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == k[ki]) {
            pi += 1;
            ki += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ki));
            pi += 1;
        } else if let Some((sp, sk)) = star {
            pi = sp + 1;
            ki = sk + 1;
            star = Some((sp, sk + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();
        cache.set("rooms", &vec![1, 2, 3]).await.unwrap();
        assert_eq!(cache.get::<Vec<i32>>("rooms").await.unwrap(), Some(vec![1, 2, 3]));

        cache.delete("rooms").await;
        assert_eq!(cache.get::<Vec<i32>>("rooms").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_or_load_runs_loader_once() {
        let cache = MemoryCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let v: Result<String, anyhow::Error> = cache
                .get_or_load("donations:total", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("42".to_string())
                })
                .await;
            assert_eq!(v.unwrap(), "42");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_load_does_not_cache_errors() {
        let cache = MemoryCache::new();
        let first: Result<i32, &str> = cache.get_or_load("k", || async { Err("db down") }).await;
        assert!(first.is_err());

        let second: Result<i32, &str> = cache.get_or_load("k", || async { Ok(7) }).await;
        assert_eq!(second, Ok(7));
    }

    #[tokio::test]
    async fn test_load_racing_an_invalidation_is_not_cached() {
        let cache = MemoryCache::new();

        // The write lands while the old total is still being read
        let stale: Result<i64, anyhow::Error> = cache
            .get_or_load("donations:total", || async {
                cache.delete("donations:total").await;
                Ok(100)
            })
            .await;
        assert_eq!(stale.unwrap(), 100);
        assert_eq!(cache.get::<i64>("donations:total").await.unwrap(), None);

        let fresh: Result<i64, anyhow::Error> =
            cache.get_or_load("donations:total", || async { Ok(150) }).await;
        assert_eq!(fresh.unwrap(), 150);
        assert_eq!(cache.get::<i64>("donations:total").await.unwrap(), Some(150));
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = MemoryCache::with_capacity_and_ttl(10, Duration::from_millis(50));
        cache.set("events:upcoming", &1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.get::<i32>("events:upcoming").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_pattern() {
        let cache = MemoryCache::new();
        cache.set("events:upcoming", &1).await.unwrap();
        cache.set("events:all", &2).await.unwrap();
        cache.set("rooms", &3).await.unwrap();

        cache.delete_pattern("events:*").await;
        assert_eq!(cache.get::<i32>("events:all").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("events:upcoming").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("rooms").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = MemoryCache::new();
        cache.set("a", &1).await.unwrap();
        cache.clear().await;
        assert_eq!(cache.get::<i32>("a").await.unwrap(), None);
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("events:*", "events:"));
        assert!(glob_match("events:*", "events:all"));
        assert!(glob_match("room:?", "room:7"));
        assert!(!glob_match("room:?", "room:17"));
        assert!(glob_match("*:total", "donations:total"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
        assert!(glob_match("*", ""));
        assert!(!glob_match("rooms", "rooms:1"));
    }
}
