use redis::AsyncCommands;
use redis::Client;
use std::time::Duration;

use crate::db::cache::{CacheKey, RecommendationCache};
use crate::error::{AppError, AppResult};
use crate::models::RecommendationResponse;

const KEY_PREFIX: &str = "vibe";

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Recommendation cache shared across instances through Redis
///
/// Entries are written with `SET EX`, so expiry is enforced by Redis itself.
#[derive(Clone)]
pub struct RedisCache {
    redis_client: Client,
    ttl_secs: u64,
}

impl RedisCache {
    pub fn new(redis_client: Client, ttl: Duration) -> Self {
        Self {
            redis_client,
            ttl_secs: ttl.as_secs().max(1),
        }
    }

    fn redis_key(key: &CacheKey) -> String {
        format!("{}:{}", KEY_PREFIX, key)
    }

    async fn try_get(&self, key: &CacheKey) -> AppResult<Option<RecommendationResponse>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(Self::redis_key(key)).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    async fn try_set(&self, key: &CacheKey, value: &RecommendationResponse) -> AppResult<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Cache serialization error: {}", e)))?;

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(Self::redis_key(key), json, self.ttl_secs).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecommendationCache for RedisCache {
    async fn get(&self, key: &CacheKey) -> Option<RecommendationResponse> {
        match self.try_get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Redis get failed, treating as miss");
                None
            }
        }
    }

    async fn insert(&self, key: &CacheKey, value: &RecommendationResponse) {
        if let Err(e) = self.try_set(key, value).await {
            tracing::error!(error = %e, key = %key, "Failed to write to Redis cache");
        }
    }

    async fn sweep_expired(&self) {
        // Redis expires keys on its own
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
