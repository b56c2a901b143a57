use std::{sync::Arc, time::Duration};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vibe_recommend::{
    config::Config,
    db::{
        self, postgres::run_migrations, InMemoryCache, PgHistoryStore, RecommendationCache,
        RedisCache,
    },
    routes::{create_router, AppState},
    services::{providers::SpotifyProvider, Recommender},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Listening history
    let pool = db::create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    let history = Arc::new(PgHistoryStore::new(pool));

    // Recommendation cache
    let ttl = Duration::from_secs(config.cache_ttl_secs);
    let cache: Arc<dyn RecommendationCache> = match &config.redis_url {
        Some(redis_url) => {
            let client = db::create_redis_client(redis_url)?;
            Arc::new(RedisCache::new(client, ttl))
        }
        None => {
            let memory = Arc::new(InMemoryCache::new(ttl));
            if let Some(every) = config.cache_sweep_interval_secs.filter(|s| *s > 0) {
                memory.clone().spawn_sweeper(Duration::from_secs(every));
            }
            memory as Arc<dyn RecommendationCache>
        }
    };
    tracing::info!(backend = cache.name(), ttl_secs = ttl.as_secs(), "Cache ready");

    // Catalog
    let catalog = Arc::new(SpotifyProvider::from_config(&config));

    let recommender = Recommender::new(history, catalog, cache);
    let app = create_router(Arc::new(AppState::new(recommender)));

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
