pub mod cache;
pub mod history;
pub mod postgres;
pub mod redis;

pub use cache::{CacheKey, InMemoryCache, RecommendationCache};
pub use history::HistoryStore;
pub use postgres::{create_pool, PgHistoryStore};
pub use redis::{create_redis_client, RedisCache};
