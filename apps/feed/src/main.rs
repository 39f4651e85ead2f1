mod config;
mod db;
mod decision;
mod errors;
mod feed;
mod models;
mod routes;
mod scoring;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{CacheBackend, Config};
use crate::db::create_pool;
use crate::feed::cache::{FeedCache, FileFeedCache, RedisFeedCache};
use crate::routes::build_router;
use crate::scoring::RuleBasedScorer;
use crate::state::AppState;
use crate::store::postgres::PgOpportunityStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting opportunity feed v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgOpportunityStore::new(db));

    // Initialize the feed cache
    let cache: Arc<dyn FeedCache> = match &config.cache {
        CacheBackend::File { dir } => {
            info!("Feed cache: files under {}", dir.display());
            Arc::new(FileFeedCache::new(dir.clone()))
        }
        CacheBackend::Redis { url } => {
            let client = redis::Client::open(url.clone())?;
            info!("Feed cache: redis");
            Arc::new(RedisFeedCache::new(client))
        }
    };

    info!(
        "Feed settings: page size {}, {} fetch attempts, undo depth {}, daily limit {}, session idle {:?}",
        config.feed.page_size,
        config.feed.fetch_attempts,
        config.feed.undo_depth,
        config.feed.daily_swipe_limit,
        config.feed.session_idle_timeout
    );

    // Build app state
    let state = AppState::new(store, cache, Arc::new(RuleBasedScorer), config.feed.clone());

    // Tear down sessions abandoned by their clients
    let idle = config.feed.session_idle_timeout;
    let _sweeper = state
        .sessions
        .spawn_sweeper(idle, (idle / 4).max(Duration::from_secs(1)));

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
