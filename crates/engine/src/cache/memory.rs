use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use moka::{Expiry, future::Cache as MokaCache};

use super::{Cache, SCAN_BATCH, glob_match};

#[derive(Clone, Debug)]
struct Entry {
    bytes: Arc<Vec<u8>>,
    ttl: Duration,
}

/// Each entry lives for the ttl it was written with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _now: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _now: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process backend, bounded to `max_entries`.
#[derive(Clone)]
pub struct MemoryCache {
    inner: MokaCache<String, Entry>,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

impl MemoryCache {
    pub fn new(max_entries: u64) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner
            .get(key)
            .await
            .map(|entry| entry.bytes.as_ref().clone())
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let entry = Entry {
            bytes: Arc::new(value),
            ttl,
        };
        self.inner.insert(key.to_string(), entry).await;
    }

    async fn delete(&self, keys: &[String]) {
        for key in keys {
            self.inner.invalidate(key).await;
        }
    }

    async fn delete_by_pattern(&self, pattern: &str) {
        let matching: Vec<String> = self
            .inner
            .iter()
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(key, _)| key.as_ref().clone())
            .collect();
        for batch in matching.chunks(SCAN_BATCH) {
            self.delete(batch).await;
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn set_get_delete() {
        let cache = MemoryCache::new(100);
        cache.set("budgets:all:a", b"[1]".to_vec(), TTL).await;
        assert_eq!(cache.get("budgets:all:a").await, Some(b"[1]".to_vec()));

        cache.set("budgets:all:a", b"[2]".to_vec(), TTL).await;
        assert_eq!(cache.get("budgets:all:a").await, Some(b"[2]".to_vec()));

        cache.delete(&["budgets:all:a".to_string()]).await;
        assert_eq!(cache.get("budgets:all:a").await, None);
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = MemoryCache::new(100);
        cache
            .set("report:summary:a:x:y", b"{}".to_vec(), Duration::from_millis(50))
            .await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(cache.get("report:summary:a:x:y").await, None);
    }

    #[tokio::test]
    async fn pattern_delete_spares_other_keys() {
        let cache = MemoryCache::new(1000);
        for i in 0..250 {
            cache
                .set(&format!("report:summary:a:{i}:{i}"), vec![1], TTL)
                .await;
        }
        cache.set("report:summary:b:1:1", vec![2], TTL).await;
        cache.set("budgets:all:a", vec![3], TTL).await;

        cache.delete_by_pattern("report:summary:a:*").await;

        assert_eq!(cache.get("report:summary:a:7:7").await, None);
        assert_eq!(cache.get("report:summary:a:249:249").await, None);
        assert_eq!(cache.get("report:summary:b:1:1").await, Some(vec![2]));
        assert_eq!(cache.get("budgets:all:a").await, Some(vec![3]));
    }
}
