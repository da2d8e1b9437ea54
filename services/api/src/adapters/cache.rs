//! services/api/src/adapters/cache.rs
//!
//! Redis-backed implementation of the `CacheService` port. Holds the pending
//! registrations and one-time codes between register and verify-email.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use shop_core::ports::{CacheService, PortError, PortResult};

#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Opens a managed connection that reconnects on its own after failures.
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }
}

fn cache_error(err: redis::RedisError) -> PortError {
    PortError::Unexpected(format!("cache: {}", err))
}

#[async_trait]
impl CacheService for RedisCache {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> PortResult<()> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .map_err(cache_error)
    }

    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get::<_, Option<String>>(key).await.map_err(cache_error)
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key).await.map_err(cache_error)
    }
}
