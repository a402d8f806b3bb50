use std::time::Duration;

use async_trait::async_trait;

use super::Cache;

/// Fallback cache: always misses, discards writes. Stateless.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCache;

#[async_trait]
impl Cache for NoCache {
    async fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) {}

    async fn delete(&self, _keys: &[String]) {}

    async fn delete_by_pattern(&self, _pattern: &str) {}

    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_misses() {
        let cache = NoCache;
        cache
            .set("budgets:all:x", b"[]".to_vec(), Duration::from_secs(15))
            .await;
        assert_eq!(cache.get("budgets:all:x").await, None);
        cache.delete(&["budgets:all:x".to_string()]).await;
        cache.delete_by_pattern("*").await;
    }
}
