use std::time::Duration;

use ::redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use async_trait::async_trait;

use super::{Cache, SCAN_BATCH};
use crate::{EngineError, ResultEngine};

/// Live backend on a redis server.
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Connects and checks reachability with a `PING`, both bounded by
    /// `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> ResultEngine<Self> {
        let client = Client::open(url).map_err(|err| EngineError::Internal(err.to_string()))?;
        let probe = async {
            let mut conn = client.get_multiplexed_async_connection().await?;
            let _pong: String = ::redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, ::redis::RedisError>(conn)
        };
        match tokio::time::timeout(timeout, probe).await {
            Ok(Ok(conn)) => Ok(Self { conn }),
            Ok(Err(err)) => Err(EngineError::Internal(err.to_string())),
            Err(_) => Err(EngineError::Internal(format!(
                "redis did not answer within {timeout:?}"
            ))),
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<Vec<u8>>>(key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("cache get error: {err}");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        if let Err(err) = conn.set_ex::<_, _, ()>(key, value, seconds).await {
            tracing::warn!("cache set error: {err}");
        }
    }

    async fn delete(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        let mut conn = self.conn.clone();
        if let Err(err) = conn.unlink::<_, ()>(keys).await {
            tracing::warn!("cache delete error: {err}");
        }
    }

    async fn delete_by_pattern(&self, pattern: &str) {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        loop {
            let scanned: Result<(u64, Vec<String>), _> = ::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await;
            let (next, keys) = match scanned {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!("cache scan error: {err}");
                    return;
                }
            };
            if !keys.is_empty()
                && let Err(err) = conn.unlink::<_, ()>(&keys).await
            {
                tracing::warn!("cache delete error: {err}");
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
