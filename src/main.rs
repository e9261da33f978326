use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use wishfeed_api::{
    config::Config,
    db::{self, FeedStore},
    routes::{create_router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let db_pool = db::create_pool(&config.database_url).await?;
    sqlx::migrate!().run(&db_pool).await?;

    let redis_client = db::create_redis_client(&config.redis_url)?;
    let (cache, _cache_writer) = db::Cache::new(redis_client).await;

    let store: Arc<dyn FeedStore> = Arc::new(db::PostgresFeedStore::new(db_pool));
    let state = Arc::new(AppState::new(store, cache));
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "wishfeed-api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
