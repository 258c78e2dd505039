use crate::domain::CacheRepository;
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Pool, Runtime};
use tracing::{error, info, warn};

/// Redis-backed cache for short-link destinations.
///
/// Without a URL (or when the pool cannot be created) every lookup is a miss
/// and writes are dropped, so conversion keeps working without Redis.
pub struct RedisRepository {
    pool: Option<Pool>,
}

impl RedisRepository {
    pub fn new(url: Option<String>) -> Self {
        let Some(redis_url) = url else {
            info!("REDIS_URL not provided, short-link caching disabled");
            return Self { pool: None };
        };
        match Config::from_url(&redis_url).create_pool(Some(Runtime::Tokio1)) {
            Ok(pool) => {
                info!("Redis connection pool initialized for short-link cache");
                Self { pool: Some(pool) }
            }
            Err(e) => {
                error!("Failed to create Redis connection pool: {}", e);
                Self { pool: None }
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }
}

#[async_trait]
impl CacheRepository for RedisRepository {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let Some(pool) = &self.pool else {
            return Ok(None);
        };
        match pool.get().await {
            Ok(mut conn) => {
                let result: Option<String> = conn.get(key).await.ok();
                Ok(result)
            }
            Err(e) => {
                warn!("Redis unavailable, treating '{}' as a miss: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> anyhow::Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        match pool.get().await {
            Ok(mut conn) => {
                let _: () = conn.set_ex(key, value, ttl_seconds).await?;
            }
            Err(e) => {
                warn!("Redis unavailable, dropping write for '{}': {}", key, e);
            }
        }
        Ok(())
    }
}
