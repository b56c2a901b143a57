use chrono::{DateTime, TimeDelta, Utc};
use std::{collections::HashMap, fmt::Display, sync::Arc, time::Duration};
use tokio::{sync::RwLock, task::JoinHandle};

use crate::models::RecommendationResponse;

/// Default lifetime of a cached recommendation
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Recommendation { user_id: String, mood: String },
}

impl CacheKey {
    pub fn recommendation(user_id: &str, mood: &str) -> Self {
        CacheKey::Recommendation {
            user_id: user_id.to_string(),
            mood: mood.to_string(),
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendation { user_id, mood } => write!(f, "{}_{}", user_id, mood),
        }
    }
}

/// Short-lived memoization of recommendation results
///
/// Implementations never fail a request: backend errors are logged and surface as a miss.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommendationCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<RecommendationResponse>;

    async fn insert(&self, key: &CacheKey, value: &RecommendationResponse);

    /// Drops every entry older than the TTL
    async fn sweep_expired(&self);

    /// Cache backend name for logging
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: RecommendationResponse,
    cached_at: DateTime<Utc>,
}

/// Process-local cache guarded by an async RwLock
pub struct InMemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: TimeDelta,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl InMemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or_else(|_| TimeDelta::days(365)),
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.cached_at > self.ttl
    }

    /// Stores an entry with an explicit timestamp
    pub async fn insert_at(
        &self,
        key: &CacheKey,
        value: &RecommendationResponse,
        cached_at: DateTime<Utc>,
    ) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.clone(),
            CacheEntry {
                data: value.clone(),
                cached_at,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Spawns a task that sweeps expired entries on a fixed interval
    ///
    /// The lazy sweep before every lookup still runs; this only bounds how long dead entries
    /// linger between requests.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tracing::info!(interval_secs = every.as_secs(), "Cache sweeper started");

            loop {
                ticker.tick().await;
                self.sweep_expired().await;
            }
        })
    }
}

#[async_trait::async_trait]
impl RecommendationCache for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<RecommendationResponse> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;

        if self.is_expired(entry, Utc::now()) {
            return None;
        }

        Some(entry.data.clone())
    }

    async fn insert(&self, key: &CacheKey, value: &RecommendationResponse) {
        self.insert_at(key, value, Utc::now()).await;
    }

    async fn sweep_expired(&self) {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();

        entries.retain(|_, entry| !self.is_expired(entry, now));

        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = entries.len(), "Swept expired cache entries");
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
