//! Cache-aside store.
//!
//! The engine talks to one [`Cache`] trait object, chosen once at startup by
//! [`select`] and handed to [`EngineBuilder::cache`](crate::EngineBuilder::cache).
//! Every backend swallows its own transport errors: a failing cache behaves
//! like an empty one and never fails a request.
//!
//! Keys are namespaced by user:
//!
//! - `budgets:all:{user}`: the budgets listing;
//! - `report:summary:{user}:{from}:{to}`: one report window.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

pub use self::memory::MemoryCache;
pub use self::noop::NoCache;
pub use self::redis::RedisCache;

mod memory;
mod noop;
mod redis;

/// Upper bound on keys handled per scan round of `delete_by_pattern`.
pub const SCAN_BATCH: usize = 100;

#[async_trait]
pub trait Cache: Send + Sync + fmt::Debug {
    /// Returns the stored bytes, or `None` on miss or backend failure.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration);

    async fn delete(&self, keys: &[String]);

    /// Deletes every key matching the glob `pattern` (`*` and `?`) found by a
    /// cursor scan. Keys created while the scan runs may survive.
    async fn delete_by_pattern(&self, pattern: &str);

    /// Backend name, for logs.
    fn name(&self) -> &'static str;
}

/// Entry lifetimes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheTtls {
    pub budgets: Duration,
    pub report: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            budgets: Duration::from_secs(15),
            report: Duration::from_secs(30),
        }
    }
}

pub fn budgets_key(user_id: Uuid) -> String {
    format!("budgets:all:{user_id}")
}

pub fn report_key(user_id: Uuid, from: NaiveDate, to: NaiveDate) -> String {
    format!(
        "report:summary:{user_id}:{}:{}",
        from.format("%Y-%m-%d"),
        to.format("%Y-%m-%d")
    )
}

/// Matches every report window of `user_id`.
pub fn report_pattern(user_id: Uuid) -> String {
    format!("report:summary:{user_id}:*")
}

/// Which backend to try at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    None,
    Memory,
    Redis,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub url: String,
    pub connect_timeout_ms: u64,
    pub max_entries: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::None,
            url: "redis://127.0.0.1:6379/0".to_string(),
            connect_timeout_ms: 2000,
            max_entries: 10_000,
        }
    }
}

/// Picks the cache for the lifetime of the process.
///
/// An unreachable redis falls back to [`NoCache`]; the choice is never
/// revisited.
pub async fn select(settings: &CacheSettings) -> Arc<dyn Cache> {
    match settings.backend {
        CacheBackend::None => Arc::new(NoCache),
        CacheBackend::Memory => Arc::new(MemoryCache::new(settings.max_entries)),
        CacheBackend::Redis => {
            let timeout = Duration::from_millis(settings.connect_timeout_ms);
            match RedisCache::connect(&settings.url, timeout).await {
                Ok(cache) => {
                    tracing::info!("redis cache connected");
                    Arc::new(cache)
                }
                Err(err) => {
                    tracing::warn!("redis disabled: {err}");
                    Arc::new(NoCache)
                }
            }
        }
    }
}

/// Glob match supporting `*` (any run) and `?` (one character).
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();
    let (mut p, mut k) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, k));
                p += 1;
            }
            Some(&c) if c == '?' || c == key[k] => {
                p += 1;
                k += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    k = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_user() {
        let user = Uuid::nil();
        let from = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(
            budgets_key(user),
            "budgets:all:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            report_key(user, from, to),
            "report:summary:00000000-0000-0000-0000-000000000000:2025-02-01:2025-03-01"
        );
        assert!(glob_match(&report_pattern(user), &report_key(user, from, to)));
        assert!(!glob_match(
            &report_pattern(Uuid::new_v4()),
            &report_key(user, from, to)
        ));
    }

    #[test]
    fn glob_wildcards() {
        assert!(glob_match("*", ""));
        assert!(glob_match("a*c", "abbbc"));
        assert!(glob_match("a*c", "ac"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(glob_match("*:b:*", "x:b:y"));
        assert!(!glob_match("report:*", "budgets:all:x"));
        assert!(glob_match("a*b*c", "aXbYbZc"));
        assert!(!glob_match("abc", "abcd"));
    }

    #[tokio::test]
    async fn unreachable_redis_falls_back_to_no_cache() {
        let settings = CacheSettings {
            backend: CacheBackend::Redis,
            url: "redis://127.0.0.1:1/0".to_string(),
            connect_timeout_ms: 200,
            ..CacheSettings::default()
        };
        let cache = select(&settings).await;
        assert_eq!(cache.name(), "none");
    }

    #[tokio::test]
    async fn memory_backend_is_selected_without_probe() {
        let settings = CacheSettings {
            backend: CacheBackend::Memory,
            ..CacheSettings::default()
        };
        assert_eq!(select(&settings).await.name(), "memory");
    }
}
