//! Redis-based response cache.
//!
//! Caching is best effort: connection failures at startup disable the cache,
//! and failures at call time are logged and reported as a miss (for reads)
//! or silently dropped (for writes). A request is never failed because of
//! the cache.

use async_trait::async_trait;
use bytes::Bytes;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cache_key::CacheKey;

/// Payloads above this size are still cached, with a warning.
pub const LARGE_PAYLOAD_BYTES: usize = 10_000_000;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis connection failed: {0}")]
    Connection(String),

    #[error("Cache {op} failed: {message}")]
    Command { op: &'static str, message: String },
}

/// Key/value store for serialized responses.
///
/// Implementations must swallow their own failures; callers treat `None`
/// as a miss and never learn why.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<Bytes>;

    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration);

    /// Whether the backing store is reachable.
    async fn ping(&self) -> bool;
}

/// Redis response cache client.
///
/// Holds no connection when Redis was unreachable at startup; every call is
/// then a no-op.
#[derive(Clone)]
pub struct RedisCache {
    conn: Option<MultiplexedConnection>,
}

impl RedisCache {
    /// Connect to Redis and verify the connection with `PING`.
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        let client =
            Client::open(redis_url).map_err(|e| CacheError::Connection(e.to_string()))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self { conn: Some(conn) })
    }

    /// Connect, or fall back to a disabled cache with a warning.
    pub async fn connect_or_disabled(redis_url: &str) -> Self {
        match Self::connect(redis_url).await {
            Ok(cache) => {
                info!(url = %redis_url, "Successfully connected to Redis");
                cache
            }
            Err(e) => {
                warn!(error = %e, "Could not connect to Redis. Caching will be disabled.");
                Self::disabled()
            }
        }
    }

    /// A cache that stores nothing.
    pub fn disabled() -> Self {
        Self { conn: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }

    async fn try_get(conn: &mut MultiplexedConnection, key: &CacheKey) -> CacheResult<Option<Bytes>> {
        let result: Option<Vec<u8>> = conn
            .get(key.as_str())
            .await
            .map_err(|e| CacheError::Command {
                op: "get",
                message: e.to_string(),
            })?;

        Ok(result.map(Bytes::from))
    }

    async fn try_set(
        conn: &mut MultiplexedConnection,
        key: &CacheKey,
        value: &[u8],
        ttl: Duration,
    ) -> CacheResult<()> {
        let _: () = conn
            .set_ex(key.as_str(), value, ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError::Command {
                op: "set",
                message: e.to_string(),
            })?;

        Ok(())
    }
}

#[async_trait]
impl ResponseCache for RedisCache {
    async fn get(&self, key: &CacheKey) -> Option<Bytes> {
        let Some(conn) = &self.conn else {
            debug!("Cache is disabled (Redis not connected)");
            return None;
        };
        let mut conn = conn.clone();

        match Self::try_get(&mut conn, key).await {
            Ok(Some(data)) => {
                info!(key = %key, "Cache HIT");
                Some(data)
            }
            Ok(None) => {
                info!(key = %key, "Cache MISS");
                None
            }
            Err(e) => {
                error!(key = %key, error = %e, "Error reading from cache");
                None
            }
        }
    }

    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) {
        let Some(conn) = &self.conn else {
            return;
        };
        let mut conn = conn.clone();

        let size = value.len();
        info!(key = %key, size, "Attempting to cache response");
        if size > LARGE_PAYLOAD_BYTES {
            warn!(size, "Cache data is very large, this may be slow");
        }

        match Self::try_set(&mut conn, key, &value, ttl).await {
            Ok(()) => info!(key = %key, "Successfully saved to cache"),
            Err(e) => error!(key = %key, error = %e, "Error saving to cache"),
        }
    }

    async fn ping(&self) -> bool {
        let Some(conn) = &self.conn else {
            return false;
        };
        let mut conn = conn.clone();

        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }
}
